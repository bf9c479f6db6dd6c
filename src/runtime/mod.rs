//! Orchestration runtime.
//!
//! Provides the proof/transaction pipeline, per-wallet serialization and the
//! [`Orchestrator`] entry point tying them to the sync gate and engine lifecycle.

pub mod api;
pub mod orchestrator;
pub mod pipeline;
pub mod wallet_manager;

pub use api::{plan_transfer, Orchestrator, ShieldedTransfer, TransferPlan, TransferReceipt};
pub use orchestrator::{PipelineStatus, PipelineTracker};
pub use pipeline::{
    Collaborators, GasEstimated, PipelineState, Populated, Proven, Sent, Unproven,
};
pub use wallet_manager::{WalletGuard, WalletManager};
