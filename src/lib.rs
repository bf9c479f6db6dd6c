//! # Shield-Bridge
//!
//! Orchestration of cross-chain shielded transfers.
//!
//! Value held in a shielded pool on a home chain is unshielded, bridged and
//! delivered to a plaintext receiver on another chain in one proof-verified
//! transaction. This crate computes fee-adjusted amounts, assembles the
//! relay's cross-contract calls, prices gas in two phases, and drives the
//! proving engine through a strictly ordered pipeline.
//!
//! ## Features
//!
//! - **Typed fees**: post-fee amounts are a distinct type
//! - **Two-call bridge sequence**: `transfer` then `withdraw`, ABI encoded
//! - **Typestate pipeline**: `Unproven → GasEstimated → Proven → Populated → Sent`
//! - **Per-wallet serialization**: no two pipelines select the same notes
//! - **Adapter contracts**: source-chain and home-chain forwarders over a local gateway
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ethers::types::{Address, U256};
//! use shield_bridge::{
//!     plan_transfer, Chain, NetworkRegistry, PlaintextAddress, RecipientSpec, RevertOptions,
//!     ShieldedAmount, ShieldedTransfer, WalletId,
//! };
//!
//! let registry = NetworkRegistry::from_path("networks.json").unwrap();
//! let intent = ShieldedTransfer {
//!     wallet: WalletId::from("alice"),
//!     amount: ShieldedAmount::new(Address::repeat_byte(0x11), U256::from(1_000_000u64)).unwrap(),
//!     recipient: RecipientSpec::External {
//!         address: PlaintextAddress::from(Address::repeat_byte(0xCD)),
//!         destination: Chain::Ethereum,
//!     },
//!     destination_gas_limit: None,
//!     revert_options: Some(RevertOptions::refund_to(Address::repeat_byte(0x0A))),
//!     uses_public_relay: false,
//! };
//!
//! let plan = plan_transfer(&registry, &intent).unwrap();
//! assert_eq!(plan.request.calls().len(), 2);
//! ```

pub mod calls;
pub mod config;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod fee;
pub mod gas;
pub mod runtime;
pub mod sync;
pub mod types;

// Re-export core functionality
pub use calls::{assemble_bridge_calls, BridgeRoute, WithdrawArgs};
pub use fee::{apply_fee, apply_unshield_fee, quote_min_output};
pub use gas::{compute_batch_min_gas_price, GasEstimator, GasOracle};
pub use runtime::{plan_transfer, Orchestrator, ShieldedTransfer, TransferPlan, TransferReceipt};
pub use sync::SyncGate;

// Re-export types
pub use config::{Chain, ChainConfig, NetworkRegistry, ProtocolConfig};
pub use error::{PipelineStage, Result, ShieldBridgeError};
pub use types::{
    CrossContractCall, EncryptionKey, FeeAdjustedAmount, GasDetails, PlaintextAddress,
    PopulatedTransaction, RecipientSpec, RevertOptions, ShieldedAddress, ShieldedAmount, WalletId,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
