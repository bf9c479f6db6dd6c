//! Ledger scanner interface.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use tokio::sync::{broadcast, watch};

use crate::config::Chain;
use crate::error::Result;
use crate::types::WalletId;

/// Scan progress of the two trees the proof depends on.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ScanProgress {
    pub notes: f64,
    pub nullifiers: f64,
}

impl ScanProgress {
    pub const COMPLETE: ScanProgress = ScanProgress {
        notes: 1.0,
        nullifiers: 1.0,
    };

    pub fn is_complete(&self) -> bool {
        self.notes >= 1.0 && self.nullifiers >= 1.0
    }
}

/// Emitted once a scan settles and a wallet's balances changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub wallet: WalletId,
    pub chain: Chain,
    pub balances: Vec<(Address, U256)>,
}

/// The note/nullifier tree scanner. It owns all writes to the synced state.
#[async_trait]
pub trait LedgerScanner: Send + Sync {
    /// Latest scan progress for `chain`.
    fn scan_progress(&self, chain: Chain) -> watch::Receiver<ScanProgress>;

    fn balance_updates(&self) -> broadcast::Receiver<BalanceUpdate>;

    /// Kick off a rescan for the wallet. Returns once the request is accepted,
    /// not when the scan finishes. The rescan must publish at least one
    /// progress value on `scan_progress`, even when nothing changed.
    async fn refresh(&self, wallet: &WalletId, chain: Chain) -> Result<()>;
}
