//! Error types for shield-bridge operations.
//!
//! Provides strongly-typed errors for every orchestration stage using `thiserror`.
//! Pipeline failures carry the stage and the external call that produced them so
//! callers can decide whether a retry is worth its cost.

use core::fmt;
use thiserror::Error;

use crate::contracts::ContractError;

/// Stage of the proof/transaction pipeline at which an error surfaced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Input validation, fee calculation and call assembly.
    Preparation,
    /// Waiting for the ledger scanner.
    Sync,
    /// Reading live network fee parameters.
    GasPricing,
    /// Unproven → GasEstimated.
    GasEstimation,
    /// GasEstimated → Proven.
    Proving,
    /// Proven → Populated.
    Population,
    /// Populated → Sent.
    Submission,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preparation => "preparation",
            Self::Sync => "sync",
            Self::GasPricing => "gas-pricing",
            Self::GasEstimation => "gas-estimation",
            Self::Proving => "proving",
            Self::Population => "population",
            Self::Submission => "submission",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during shield-bridge operations.
#[derive(Debug, Error)]
pub enum ShieldBridgeError {
    /// Rejected before any network call; the user corrects the input.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Registry lookup or validation failure.
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// RPC unavailable or gas parameters unreadable.
    #[error("Network error: {reason}")]
    Network { reason: String },

    /// Proving engine internal failure or stale root.
    #[error("Proof generation failed: {reason}")]
    Proof { reason: String },

    /// Signature rejected or transaction reverted on-chain.
    #[error("Submission failed: {reason}")]
    Submission { reason: String },

    /// Proving engine is not in a usable lifecycle state.
    #[error("Engine error: {reason}")]
    Engine { reason: String },

    /// Ledger scanner has not reported a full sync for the wallet.
    #[error("Wallet {wallet} is not synced to the latest root")]
    NotSynced { wallet: String },

    /// Attempted to skip or revisit a pipeline state.
    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Adapter contract rejected the call.
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    /// Failure inside a pipeline stage while calling an external collaborator.
    #[error("[{stage}] {call} failed: {source}")]
    Stage {
        stage: PipelineStage,
        call: &'static str,
        #[source]
        source: Box<ShieldBridgeError>,
    },

    /// File I/O error while loading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShieldBridgeError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput { reason: reason.into() }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }

    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network { reason: reason.into() }
    }

    pub fn proof(reason: impl Into<String>) -> Self {
        Self::Proof { reason: reason.into() }
    }

    pub fn submission(reason: impl Into<String>) -> Self {
        Self::Submission { reason: reason.into() }
    }

    /// Wrap this error with the stage and external call it came from.
    pub fn at(self, stage: PipelineStage, call: &'static str) -> Self {
        Self::Stage {
            stage,
            call,
            source: Box::new(self),
        }
    }

    /// The pipeline stage this error was raised in, if known.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, with stage wrappers removed.
    pub fn root_cause(&self) -> &ShieldBridgeError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether re-running the whole pipeline from `Unproven` can succeed
    /// without the user changing their input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::Network { .. }
                | Self::Proof { .. }
                | Self::Submission { .. }
                | Self::NotSynced { .. }
        )
    }
}

/// Result type alias for shield-bridge operations.
pub type Result<T> = core::result::Result<T, ShieldBridgeError>;
