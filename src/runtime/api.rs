//! Orchestrator entry point.
//!
//! Turns a user intent into a proof request, then drives it through the sync
//! gate and the pipeline while holding the wallet's lock.

use std::sync::Arc;

use ethers::types::{H256, U256};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calls::BridgeRoute;
use crate::config::NetworkRegistry;
use crate::engine::{EngineLifecycle, ProgressSender, ProofKind, ProofRequest};
use crate::error::{PipelineStage, Result, ShieldBridgeError};
use crate::fee::apply_unshield_fee;
use crate::runtime::orchestrator::{PipelineStatus, PipelineTracker};
use crate::runtime::pipeline::{Collaborators, GasEstimated, Populated, Proven, Sent, Unproven};
use crate::runtime::wallet_manager::WalletManager;
use crate::types::{
    EncryptionKey, FeeAdjustedAmount, GasDetails, PopulatedTransaction, RecipientSpec,
    RevertOptions, ShieldedAmount, WalletId,
};

/// A request to move shielded value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldedTransfer {
    pub wallet: WalletId,
    pub amount: ShieldedAmount,
    pub recipient: RecipientSpec,
    /// Destination-leg gas limit; `None` uses the chain minimum.
    #[serde(default)]
    pub destination_gas_limit: Option<U256>,
    /// Required when the recipient is on another chain.
    #[serde(default)]
    pub revert_options: Option<RevertOptions>,
    #[serde(default)]
    pub uses_public_relay: bool,
}

/// Everything decided before the first network call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferPlan {
    pub request: ProofRequest,
    /// Set for unshields; what the receiver actually gets.
    pub fee_adjusted: Option<FeeAdjustedAmount>,
    pub route: Option<BridgeRoute>,
    pub uses_public_relay: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReceipt {
    pub tx_hash: H256,
    pub gas: GasDetails,
    pub transaction: PopulatedTransaction,
    pub fee_adjusted: Option<FeeAdjustedAmount>,
}

pub struct Orchestrator {
    registry: Arc<NetworkRegistry>,
    collaborators: Collaborators,
    lifecycle: Arc<EngineLifecycle>,
    wallets: WalletManager,
    tracker: PipelineTracker,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        collaborators: Collaborators,
        lifecycle: Arc<EngineLifecycle>,
    ) -> Result<Self> {
        registry.validate()?;
        Ok(Self {
            registry,
            collaborators,
            lifecycle,
            wallets: WalletManager::new(),
            tracker: PipelineTracker::new(),
        })
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &EngineLifecycle {
        &self.lifecycle
    }

    /// Validate the intent and build its proof request. No network access.
    pub fn plan(&self, intent: &ShieldedTransfer) -> Result<TransferPlan> {
        plan_transfer(&self.registry, intent)
    }

    /// Run the whole pipeline for `intent`.
    ///
    /// Pipelines for the same wallet run one after another; a second call
    /// waits until the first is sent or aborted. Dropping the future leaves
    /// the wallet's status `Aborted`.
    pub async fn execute(
        &self,
        intent: &ShieldedTransfer,
        key: &EncryptionKey,
        progress: ProgressSender,
    ) -> Result<TransferReceipt> {
        // 1. Reject bad input before touching anything remote
        let plan = self
            .plan(intent)
            .map_err(|e| e.at(PipelineStage::Preparation, "plan"))?;
        let _lease = self
            .lifecycle
            .lease()
            .await
            .map_err(|e| e.at(PipelineStage::Preparation, "lease"))?;

        // 2. Serialize per wallet
        let wallet = plan.request.wallet.clone();
        let _guard = self.wallets.acquire(&wallet).await;
        self.tracker.begin(&wallet);
        let _cancel = CancelOnDrop {
            tracker: &self.tracker,
            wallet: &wallet,
        };

        // 3. Drive the pipeline
        match self.run(plan, key, progress).await {
            Ok(receipt) => {
                self.tracker.complete(&wallet, receipt.tx_hash);
                Ok(receipt)
            }
            Err(e) => {
                warn!(%wallet, stage = ?e.stage(), retryable = e.is_retryable(), error = %e, "pipeline aborted");
                self.tracker.abort(&wallet, &e);
                Err(e)
            }
        }
    }

    async fn run(&self, plan: TransferPlan, key: &EncryptionKey, progress: ProgressSender) -> Result<TransferReceipt> {
        let with = &self.collaborators;
        let wallet = plan.request.wallet.clone();

        with.sync
            .ensure_synced(&wallet, plan.request.chain)
            .await
            .map_err(|e| e.at(PipelineStage::Sync, "ensure_synced"))?;

        let unproven = Unproven::new(plan.request, plan.uses_public_relay);
        let estimated = unproven.estimate_gas(with, key).await?;
        self.tracker.advance(&wallet, GasEstimated::STATE)?;

        let proven = estimated.prove(with, key, progress).await?;
        self.tracker.advance(&wallet, Proven::STATE)?;

        let populated = proven.populate(with).await?;
        self.tracker.advance(&wallet, Populated::STATE)?;

        let sent = populated.send(with).await?;
        self.tracker.advance(&wallet, Sent::STATE)?;

        info!(%wallet, tx_hash = ?sent.tx_hash, "shielded transfer submitted");
        Ok(TransferReceipt {
            tx_hash: sent.tx_hash,
            gas: sent.gas,
            transaction: sent.transaction,
            fee_adjusted: plan.fee_adjusted,
        })
    }

    pub fn status(&self, wallet: &WalletId) -> Option<PipelineStatus> {
        self.tracker.status(wallet)
    }
}

/// Marks the pipeline aborted if `execute` is dropped before an outcome.
struct CancelOnDrop<'a> {
    tracker: &'a PipelineTracker,
    wallet: &'a WalletId,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if self.tracker.cancel(self.wallet) {
            warn!(wallet = %self.wallet, "pipeline dropped before completion");
        }
    }
}

/// Route an intent:
///
/// - shielded recipient → private transfer
/// - plaintext recipient on the home chain → unshield
/// - plaintext recipient elsewhere → unshield to the relay plus `[transfer, withdraw]`
pub fn plan_transfer(registry: &NetworkRegistry, intent: &ShieldedTransfer) -> Result<TransferPlan> {
    let home = registry.home_chain();
    let amounts = vec![intent.amount];

    let (kind, fee_adjusted, route) = match &intent.recipient {
        RecipientSpec::Internal(recipient) => (
            ProofKind::Transfer {
                amounts,
                recipient: recipient.clone(),
            },
            None,
            None,
        ),
        RecipientSpec::External { address, destination } if *destination == home => {
            let to = address.to_evm()?;
            let adjusted = apply_unshield_fee(&intent.amount, registry.unshield_fee_bps());
            (ProofKind::Unshield { amounts, to }, Some(adjusted), None)
        }
        RecipientSpec::External { address, destination } => {
            let revert_options = intent.revert_options.as_ref().ok_or_else(|| {
                ShieldBridgeError::invalid_input("revert options are required for cross-chain transfers")
            })?;
            if revert_options.revert_address.is_zero() {
                return Err(ShieldBridgeError::invalid_input("revert address must not be zero"));
            }
            let route = BridgeRoute::resolve(registry, *destination, address, intent.destination_gas_limit)?;
            let adjusted = apply_unshield_fee(&intent.amount, registry.unshield_fee_bps());
            let calls = route.assemble(&adjusted, address, revert_options);
            (
                ProofKind::CrossContract {
                    unshield: amounts,
                    calls,
                },
                Some(adjusted),
                Some(route),
            )
        }
    };

    Ok(TransferPlan {
        request: ProofRequest {
            chain: home,
            wallet: intent.wallet.clone(),
            kind,
        },
        fee_adjusted,
        route,
        uses_public_relay: intent.uses_public_relay,
    })
}
