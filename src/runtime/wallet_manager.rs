//! Per-wallet serialization of pipelines.
//!
//! Two pipelines for the same wallet could select the same unspent notes, so
//! each wallet gets its own async lock. Different wallets never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::types::WalletId;

type LockMap = HashMap<WalletId, Arc<AsyncMutex<()>>>;

#[derive(Debug, Default)]
pub struct WalletManager {
    locks: Arc<Mutex<LockMap>>,
}

/// Exclusive hold on one wallet. Dropping it frees the wallet and forgets the
/// lock once nobody else is waiting on it.
#[derive(Debug)]
pub struct WalletGuard {
    wallet: WalletId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
}

impl Drop for WalletGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks
            .get(&self.wallet)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.wallet);
        }
    }
}

impl WalletManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn locks(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait until no other pipeline holds `wallet`. The guard releases it on drop.
    pub async fn acquire(&self, wallet: &WalletId) -> WalletGuard {
        let lock = self.locks().entry(wallet.clone()).or_default().clone();
        if lock.try_lock().is_err() {
            debug!(%wallet, "waiting for in-flight pipeline");
        }
        WalletGuard {
            wallet: wallet.clone(),
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
        }
    }

    /// Whether a pipeline currently holds `wallet`.
    pub fn is_busy(&self, wallet: &WalletId) -> bool {
        self.locks()
            .get(wallet)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of wallets with a held or awaited lock.
    pub fn tracked_wallets(&self) -> usize {
        self.locks().len()
    }
}
