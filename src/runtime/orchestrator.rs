//! Per-wallet pipeline status.

use std::collections::HashMap;
use std::sync::Mutex;

use ethers::types::H256;

use crate::error::{PipelineStage, Result, ShieldBridgeError};
use crate::runtime::pipeline::PipelineState;
use crate::types::WalletId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineStatus {
    Active(PipelineState),
    Completed { tx_hash: H256 },
    Aborted {
        stage: Option<PipelineStage>,
        reason: String,
    },
}

/// Last known status of each wallet's most recent pipeline.
#[derive(Debug, Default)]
pub struct PipelineTracker {
    states: Mutex<HashMap<WalletId, PipelineStatus>>,
}

impl PipelineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_states<T>(&self, f: impl FnOnce(&mut HashMap<WalletId, PipelineStatus>) -> T) -> T {
        let mut states = self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut states)
    }

    pub fn begin(&self, wallet: &WalletId) {
        self.with_states(|states| {
            states.insert(wallet.clone(), PipelineStatus::Active(PipelineState::Unproven))
        });
    }

    /// Record a transition; rejects anything but the immediate successor.
    pub fn advance(&self, wallet: &WalletId, to: PipelineState) -> Result<()> {
        self.with_states(|states| {
            let current = match states.get(wallet) {
                Some(PipelineStatus::Active(state)) => *state,
                other => {
                    return Err(ShieldBridgeError::InvalidTransition {
                        from: format!("{:?}", other),
                        to: format!("{:?}", to),
                    })
                }
            };
            let next = current.advance(to)?;
            states.insert(wallet.clone(), PipelineStatus::Active(next));
            Ok(())
        })
    }

    pub fn complete(&self, wallet: &WalletId, tx_hash: H256) {
        self.with_states(|states| states.insert(wallet.clone(), PipelineStatus::Completed { tx_hash }));
    }

    pub fn abort(&self, wallet: &WalletId, error: &ShieldBridgeError) {
        let status = PipelineStatus::Aborted {
            stage: error.stage(),
            reason: error.root_cause().to_string(),
        };
        self.with_states(|states| states.insert(wallet.clone(), status));
    }

    /// Abort a pipeline that stopped without an outcome. Returns whether one
    /// was still active.
    pub fn cancel(&self, wallet: &WalletId) -> bool {
        self.with_states(|states| match states.get(wallet) {
            Some(&PipelineStatus::Active(state)) => {
                let status = PipelineStatus::Aborted {
                    stage: None,
                    reason: format!("cancelled in {:?}", state),
                };
                states.insert(wallet.clone(), status);
                true
            }
            _ => false,
        })
    }

    pub fn status(&self, wallet: &WalletId) -> Option<PipelineStatus> {
        self.with_states(|states| states.get(wallet).cloned())
    }
}
