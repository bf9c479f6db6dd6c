//! External collaborators of the orchestrator.
//!
//! The proving engine, the ledger scanner and the transaction signer are
//! black boxes; this module only fixes the calls made to them and in what order.

pub mod lifecycle;
pub mod progress;
pub mod scanner;
pub mod signer;

pub use lifecycle::{EngineBackend, EngineLease, EngineLifecycle, EngineState};
pub use progress::{progress_channel, ProgressReceiver, ProgressSender};
pub use scanner::{BalanceUpdate, LedgerScanner, ScanProgress};
pub use signer::{MiddlewareSigner, TransactionSigner};

use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::config::Chain;
use crate::error::Result;
use crate::types::{
    CrossContractCall, EncryptionKey, GasDetails, PopulatedTransaction, ShieldedAddress,
    ShieldedAmount, WalletId,
};

/// What the proof has to authorize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofKind {
    /// Private transfer to another shielded address.
    Transfer {
        amounts: Vec<ShieldedAmount>,
        recipient: ShieldedAddress,
    },
    /// Unshield to a plaintext address on the home chain.
    Unshield {
        amounts: Vec<ShieldedAmount>,
        to: Address,
    },
    /// Unshield to the relay contract, which then runs `calls` atomically.
    CrossContract {
        unshield: Vec<ShieldedAmount>,
        calls: Vec<CrossContractCall>,
    },
}

/// One proof request, bound to a wallet and the home chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub chain: Chain,
    pub wallet: WalletId,
    pub kind: ProofKind,
}

impl ProofRequest {
    pub fn amounts(&self) -> &[ShieldedAmount] {
        match &self.kind {
            ProofKind::Transfer { amounts, .. } | ProofKind::Unshield { amounts, .. } => amounts,
            ProofKind::CrossContract { unshield, .. } => unshield,
        }
    }

    pub fn calls(&self) -> &[CrossContractCall] {
        match &self.kind {
            ProofKind::CrossContract { calls, .. } => calls,
            _ => &[],
        }
    }
}

/// The privacy proving engine.
///
/// Called strictly in order: estimate, prove, populate.
#[async_trait]
pub trait ProvingEngine: Send + Sync {
    /// Gas for the operation before any proof exists.
    async fn estimate_unproven_gas(
        &self,
        request: &ProofRequest,
        key: &EncryptionKey,
        original_gas: &GasDetails,
    ) -> Result<U256>;

    /// Build the spend proof. Long running; reports progress in `[0, 1]`.
    async fn generate_proof(
        &self,
        request: &ProofRequest,
        key: &EncryptionKey,
        batch_min_gas_price: U256,
        progress: ProgressSender,
    ) -> Result<()>;

    /// Bind the existing proof to `gas` and produce the signable payload.
    async fn populate_transaction(
        &self,
        request: &ProofRequest,
        batch_min_gas_price: U256,
        gas: &GasDetails,
    ) -> Result<PopulatedTransaction>;
}
