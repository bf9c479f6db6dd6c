//! Sync gate.
//!
//! Blocks a pipeline until the ledger scanner reports both the note tree and
//! the nullifier tree fully scanned, so proofs are never built against a stale
//! Merkle root.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Chain;
use crate::engine::{LedgerScanner, ScanProgress};
use crate::error::{Result, ShieldBridgeError};
use crate::types::WalletId;

pub struct SyncGate {
    scanner: Arc<dyn LedgerScanner>,
    synced: Mutex<HashSet<(WalletId, Chain)>>,
    releases: AtomicU64,
    timeout: Option<Duration>,
}

impl SyncGate {
    pub fn new(scanner: Arc<dyn LedgerScanner>) -> Self {
        Self {
            scanner,
            synced: Mutex::new(HashSet::new()),
            releases: AtomicU64::new(0),
            timeout: None,
        }
    }

    /// Give up with [`ShieldBridgeError::NotSynced`] after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Refresh the wallet and wait until both trees report progress 1.0.
    ///
    /// Only progress published after the refresh counts; a completed earlier
    /// scan never opens the gate.
    pub async fn ensure_synced(&self, wallet: &WalletId, chain: Chain) -> Result<()> {
        let mut progress = self.scanner.scan_progress(chain);
        progress.mark_unchanged();
        self.scanner.refresh(wallet, chain).await?;

        let wait = wait_for_rescan(&mut progress, wallet, chain);
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(outcome) => outcome?,
                Err(_) => {
                    return Err(ShieldBridgeError::NotSynced {
                        wallet: wallet.to_string(),
                    })
                }
            },
            None => wait.await?,
        }

        self.releases.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut synced) = self.synced.lock() {
            synced.insert((wallet.clone(), chain));
        }
        info!(%wallet, %chain, "ledger synced to latest root");
        Ok(())
    }

    /// Whether `ensure_synced` has completed at least once for this wallet.
    pub fn has_synced(&self, wallet: &WalletId, chain: Chain) -> bool {
        self.synced
            .lock()
            .map(|synced| synced.contains(&(wallet.clone(), chain)))
            .unwrap_or(false)
    }

    /// Number of times the gate opened.
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }
}

async fn wait_for_rescan(
    progress: &mut watch::Receiver<ScanProgress>,
    wallet: &WalletId,
    chain: Chain,
) -> Result<()> {
    let mut last = ScanProgress::default();
    loop {
        progress
            .changed()
            .await
            .map_err(|_| ShieldBridgeError::network("ledger scanner stopped reporting progress"))?;
        let current = *progress.borrow_and_update();
        if current.notes < last.notes || current.nullifiers < last.nullifiers {
            warn!(%wallet, %chain, ?current, "scan progress moved backwards");
        }
        last = current;
        debug!(%wallet, %chain, notes = current.notes, nullifiers = current.nullifiers, "scan progress");
        if current.is_complete() {
            return Ok(());
        }
    }
}
