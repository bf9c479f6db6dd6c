//! Explicit lifecycle of the proving engine.
//!
//! The engine is started once, can be stopped, and can be reset by wiping the
//! local ledger and starting again. Pipelines run under an [`EngineLease`];
//! stop and reset wait until every lease is returned.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, RwLock};
use tracing::{info, warn};

use crate::error::{Result, ShieldBridgeError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Stopped,
}

/// Start/stop hooks of the engine implementation.
#[async_trait]
pub trait EngineBackend: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Delete the locally cached notes, nullifiers and Merkle trees.
    async fn wipe_local_ledger(&self) -> Result<()>;
}

pub struct EngineLifecycle {
    backend: Arc<dyn EngineBackend>,
    state: Mutex<EngineState>,
    in_use: Arc<RwLock<()>>,
}

/// Keeps the engine from being stopped or reset while a pipeline runs.
#[derive(Debug)]
pub struct EngineLease {
    _guard: OwnedRwLockReadGuard<()>,
}

impl EngineLifecycle {
    pub fn new(backend: Arc<dyn EngineBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(EngineState::Uninitialized),
            in_use: Arc::new(RwLock::new(())),
        }
    }

    pub async fn state(&self) -> EngineState {
        *self.state.lock().await
    }

    /// Uninitialized/Stopped → Initializing → Ready. A failed start leaves the
    /// engine Stopped. A start issued while another is initializing fails.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            match *state {
                EngineState::Ready => return Ok(()),
                EngineState::Initializing => {
                    return Err(ShieldBridgeError::Engine {
                        reason: "engine is already initializing".into(),
                    })
                }
                EngineState::Uninitialized | EngineState::Stopped => {}
            }
            *state = EngineState::Initializing;
        }

        let outcome = self.backend.start().await;
        let mut state = self.state.lock().await;
        match outcome {
            Ok(()) => {
                *state = EngineState::Ready;
                info!("proving engine ready");
                Ok(())
            }
            Err(e) => {
                *state = EngineState::Stopped;
                warn!(error = %e, "proving engine failed to start");
                Err(e)
            }
        }
    }

    /// Ready → Stopped once in-flight pipelines finish. Stopping an engine
    /// that never started is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let _exclusive = self.in_use.write().await;
        let mut state = self.state.lock().await;
        if *state == EngineState::Ready {
            self.backend.stop().await?;
            *state = EngineState::Stopped;
            info!("proving engine stopped");
        }
        Ok(())
    }

    /// Wipe-and-restart: stop, delete the local ledger, start again. Waits for
    /// in-flight pipelines and holds new ones back until the engine is up.
    pub async fn reset(&self) -> Result<()> {
        let _exclusive = self.in_use.write().await;
        {
            let mut state = self.state.lock().await;
            if *state == EngineState::Initializing {
                return Err(ShieldBridgeError::Engine {
                    reason: "engine is initializing".into(),
                });
            }
            if *state == EngineState::Ready {
                self.backend.stop().await?;
            }
            *state = EngineState::Stopped;
            self.backend.wipe_local_ledger().await?;
            info!("local ledger wiped");
        }
        self.start().await
    }

    /// Lease a `Ready` engine for the length of one pipeline.
    pub async fn lease(&self) -> Result<EngineLease> {
        let guard = self.in_use.clone().read_owned().await;
        self.ensure_ready().await?;
        Ok(EngineLease { _guard: guard })
    }

    pub async fn ensure_ready(&self) -> Result<()> {
        match self.state().await {
            EngineState::Ready => Ok(()),
            other => Err(ShieldBridgeError::Engine {
                reason: format!("engine is {:?}, expected Ready", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingBackend {
        starts: AtomicUsize,
        wipes: AtomicUsize,
        fail_start: AtomicBool,
        start_delay: Duration,
    }

    #[async_trait]
    impl EngineBackend for CountingBackend {
        async fn start(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.start_delay).await;
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(ShieldBridgeError::Engine { reason: "artifacts missing".into() });
            }
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            Ok(())
        }

        async fn wipe_local_ledger(&self) -> Result<()> {
            self.wipes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let backend = Arc::new(CountingBackend::default());
        let lifecycle = EngineLifecycle::new(backend.clone());

        assert_eq!(lifecycle.state().await, EngineState::Uninitialized);
        assert!(lifecycle.ensure_ready().await.is_err());

        lifecycle.start().await.unwrap();
        lifecycle.start().await.unwrap();
        assert_eq!(lifecycle.state().await, EngineState::Ready);
        assert_eq!(backend.starts.load(Ordering::SeqCst), 1);

        lifecycle.stop().await.unwrap();
        assert_eq!(lifecycle.state().await, EngineState::Stopped);

        lifecycle.reset().await.unwrap();
        assert_eq!(lifecycle.state().await, EngineState::Ready);
        assert_eq!(backend.wipes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_start_leaves_engine_stopped() {
        let backend = Arc::new(CountingBackend::default());
        backend.fail_start.store(true, Ordering::SeqCst);
        let lifecycle = EngineLifecycle::new(backend);

        assert!(lifecycle.start().await.is_err());
        assert_eq!(lifecycle.state().await, EngineState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initializing_is_observable() {
        let backend = Arc::new(CountingBackend {
            start_delay: Duration::from_millis(100),
            ..Default::default()
        });
        let lifecycle = Arc::new(EngineLifecycle::new(backend.clone()));

        let starting = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.start().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(lifecycle.state().await, EngineState::Initializing);
        assert!(lifecycle.start().await.is_err());
        assert!(lifecycle.lease().await.is_err());

        starting.await.unwrap().unwrap();
        assert_eq!(lifecycle.state().await, EngineState::Ready);
        assert_eq!(backend.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_waits_for_leases() {
        let backend = Arc::new(CountingBackend::default());
        let lifecycle = Arc::new(EngineLifecycle::new(backend.clone()));
        lifecycle.start().await.unwrap();

        let lease = lifecycle.lease().await.unwrap();
        let resetting = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.reset().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!resetting.is_finished());
        assert_eq!(backend.wipes.load(Ordering::SeqCst), 0);

        drop(lease);
        resetting.await.unwrap().unwrap();
        assert_eq!(backend.wipes.load(Ordering::SeqCst), 1);
        assert!(lifecycle.lease().await.is_ok());
    }
}
