//! Monotonic progress reporting for long-running engine calls.

use std::sync::Arc;

use tokio::sync::watch;

/// Subscriber side; `borrow()` gives the latest fraction.
pub type ProgressReceiver = watch::Receiver<f64>;

/// Publisher side handed to the proving engine.
///
/// Values are clamped to `[0, 1]` and never move backwards.
#[derive(Clone, Debug)]
pub struct ProgressSender {
    tx: Arc<watch::Sender<f64>>,
}

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = watch::channel(0.0);
    (ProgressSender { tx: Arc::new(tx) }, rx)
}

impl ProgressSender {
    /// Publish `fraction` if it moves progress forward.
    pub fn report(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.tx.send_if_modified(|current| {
            if fraction > *current {
                *current = fraction;
                true
            } else {
                false
            }
        });
    }

    pub fn finish(&self) {
        self.report(1.0);
    }

    pub fn current(&self) -> f64 {
        *self.tx.borrow()
    }
}
