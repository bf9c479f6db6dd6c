//! Proof/transaction pipeline.
//!
//! Provides the four-stage flow `Unproven → GasEstimated → Proven → Populated
//! → Sent` as one type per state. Each transition consumes the previous state,
//! so a populated payload cannot be submitted twice and gas details cannot be
//! swapped between proving and populating.

use std::sync::Arc;

use ethers::types::{H256, U256};
use tracing::{debug, info};

use crate::engine::{ProgressSender, ProofRequest, ProvingEngine, TransactionSigner};
use crate::error::{PipelineStage, Result, ShieldBridgeError};
use crate::gas::{compute_batch_min_gas_price, GasEstimator};
use crate::sync::SyncGate;
use crate::types::{EncryptionKey, GasDetails, PopulatedTransaction};

/// Named pipeline states, used for status reporting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Unproven,
    GasEstimated,
    Proven,
    Populated,
    Sent,
}

impl PipelineState {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Unproven => Some(Self::GasEstimated),
            Self::GasEstimated => Some(Self::Proven),
            Self::Proven => Some(Self::Populated),
            Self::Populated => Some(Self::Sent),
            Self::Sent => None,
        }
    }

    /// Move to `to`, which must be the immediate successor.
    pub fn advance(self, to: Self) -> Result<Self> {
        if self.next() == Some(to) {
            Ok(to)
        } else {
            Err(ShieldBridgeError::InvalidTransition {
                from: format!("{:?}", self),
                to: format!("{:?}", to),
            })
        }
    }
}

/// External collaborators a pipeline calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn ProvingEngine>,
    pub gas: Arc<GasEstimator>,
    pub signer: Arc<dyn TransactionSigner>,
    pub sync: Arc<SyncGate>,
}

/// Fresh pipeline; nothing has been asked of the engine yet.
#[derive(Debug)]
pub struct Unproven {
    request: ProofRequest,
    uses_public_relay: bool,
}

impl Unproven {
    pub const STATE: PipelineState = PipelineState::Unproven;

    pub fn new(request: ProofRequest, uses_public_relay: bool) -> Self {
        Self {
            request,
            uses_public_relay,
        }
    }

    pub fn request(&self) -> &ProofRequest {
        &self.request
    }

    /// Size the transaction and fix the gas details the proof will commit to.
    pub async fn estimate_gas(self, with: &Collaborators, key: &EncryptionKey) -> Result<GasEstimated> {
        let chain = self.request.chain;
        let wallet = &self.request.wallet;

        // 1. The sync gate must have opened for this wallet
        if !with.sync.has_synced(wallet, chain) {
            return Err(ShieldBridgeError::NotSynced {
                wallet: wallet.to_string(),
            }
            .at(PipelineStage::Sync, "ensure_synced"));
        }

        // 2. Live pricing, no simulation
        let original = with
            .gas
            .estimate_original(chain, self.uses_public_relay)
            .await
            .map_err(|e| e.at(PipelineStage::GasPricing, "estimate_original"))?;

        // 3. Unproven estimate from the engine
        let unproven = with
            .engine
            .estimate_unproven_gas(&self.request, key, &original)
            .await
            .map_err(|e| e.at(PipelineStage::GasEstimation, "estimate_unproven_gas"))?;

        // 4. Final details embedded in the signed transaction
        let gas = with
            .gas
            .estimate_for_proof(chain, unproven, self.uses_public_relay)
            .await
            .map_err(|e| e.at(PipelineStage::GasPricing, "estimate_for_proof"))?;
        let batch_min_gas_price = compute_batch_min_gas_price(&gas);

        info!(%wallet, %chain, %unproven, gas_limit = %gas.gas_estimate(), %batch_min_gas_price, "gas estimated");
        Ok(GasEstimated {
            request: self.request,
            gas,
            batch_min_gas_price,
        })
    }
}

#[derive(Debug)]
pub struct GasEstimated {
    request: ProofRequest,
    gas: GasDetails,
    batch_min_gas_price: U256,
}

impl GasEstimated {
    pub const STATE: PipelineState = PipelineState::GasEstimated;

    pub fn gas_details(&self) -> &GasDetails {
        &self.gas
    }

    pub fn batch_min_gas_price(&self) -> U256 {
        self.batch_min_gas_price
    }

    /// Generate the proof. Not retried here; a failure aborts the pipeline.
    pub async fn prove(
        self,
        with: &Collaborators,
        key: &EncryptionKey,
        progress: ProgressSender,
    ) -> Result<Proven> {
        debug!(wallet = %self.request.wallet, "generating proof");
        with.engine
            .generate_proof(&self.request, key, self.batch_min_gas_price, progress.clone())
            .await
            .map_err(|e| e.at(PipelineStage::Proving, "generate_proof"))?;
        progress.finish();

        info!(wallet = %self.request.wallet, "proof generated");
        Ok(Proven {
            request: self.request,
            gas: self.gas,
            batch_min_gas_price: self.batch_min_gas_price,
        })
    }
}

#[derive(Debug)]
pub struct Proven {
    request: ProofRequest,
    gas: GasDetails,
    batch_min_gas_price: U256,
}

impl Proven {
    pub const STATE: PipelineState = PipelineState::Proven;

    pub fn gas_details(&self) -> &GasDetails {
        &self.gas
    }

    /// Bind the proof to the same gas details it was generated for.
    pub async fn populate(self, with: &Collaborators) -> Result<Populated> {
        let transaction = with
            .engine
            .populate_transaction(&self.request, self.batch_min_gas_price, &self.gas)
            .await
            .map_err(|e| e.at(PipelineStage::Population, "populate_transaction"))?;

        debug!(wallet = %self.request.wallet, to = ?transaction.to, "transaction populated");
        Ok(Populated {
            request: self.request,
            gas: self.gas,
            transaction,
        })
    }
}

#[derive(Debug)]
pub struct Populated {
    request: ProofRequest,
    gas: GasDetails,
    transaction: PopulatedTransaction,
}

impl Populated {
    pub const STATE: PipelineState = PipelineState::Populated;

    pub fn transaction(&self) -> &PopulatedTransaction {
        &self.transaction
    }

    pub fn gas_details(&self) -> &GasDetails {
        &self.gas
    }

    /// Submit once. On failure the payload is gone; restart from [`Unproven`].
    pub async fn send(self, with: &Collaborators) -> Result<Sent> {
        let tx_hash = with
            .signer
            .submit(self.request.chain, self.transaction.clone(), &self.gas)
            .await
            .map_err(|e| e.at(PipelineStage::Submission, "submit"))?;

        info!(wallet = %self.request.wallet, ?tx_hash, "transaction sent");
        Ok(Sent {
            tx_hash,
            gas: self.gas,
            transaction: self.transaction,
        })
    }
}

/// Terminal state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sent {
    pub tx_hash: H256,
    pub gas: GasDetails,
    pub transaction: PopulatedTransaction,
}

impl Sent {
    pub const STATE: PipelineState = PipelineState::Sent;
}
