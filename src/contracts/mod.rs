//! Adapter contracts and the local chain state they run against.
//!
//! The two adapters are narrow, stateless forwarders between the shielded pool
//! and a cross-chain messaging gateway. They are modelled as plain Rust state
//! machines over a [`TokenLedger`] so their behavior can be exercised without a
//! node.

pub mod bridge_adapter;
pub mod gateway;
pub mod relay;
pub mod source_adapter;
pub mod token;

pub use bridge_adapter::{HomeChainBridgeAdapter, ShieldedPool};
pub use gateway::{
    DeliveryOutcome, DestinationBehavior, GatewayEvent, GatewayReceipt, LocalGateway,
    MessageKind, MessagingGateway, OutboundMessage,
};
pub use relay::{CallOutcome, RelayExecutor};
pub use source_adapter::{ShieldForward, ShieldRequest, SourceChainAdapter};
pub use token::{TokenLedger, NATIVE_TOKEN};

use ethers::types::{Address, U256};
use thiserror::Error;

/// `msg.sender` and `msg.value` of a contract call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    pub value: U256,
}

impl CallContext {
    pub fn from(sender: Address) -> Self {
        Self {
            sender,
            value: U256::zero(),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Reverts raised by the adapter contracts and the local chain state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("Unauthorized caller {0:?}")]
    Unauthorized(Address),
    #[error("Insufficient balance of {token:?} at {holder:?}: required {required}, available {available}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        required: U256,
        available: U256,
    },
    #[error("Insufficient allowance of {token:?} for {spender:?}: required {required}, available {available}")]
    InsufficientAllowance {
        token: Address,
        spender: Address,
        required: U256,
        available: U256,
    },
    #[error("Unexpected msg.value: expected {expected}, got {got}")]
    InvalidValue { expected: U256, got: U256 },
    #[error("Amount mismatch: expected {expected}, got {got}")]
    AmountMismatch { expected: U256, got: U256 },
    #[error("Zero amount")]
    ZeroAmount,
    #[error("No shield requests")]
    EmptyRequest,
    #[error("Shield requests must use a single asset")]
    MixedAssets,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Malformed calldata: {0}")]
    MalformedCalldata(String),
    #[error("Call {index} targets unknown contract {target:?}")]
    UnknownCall { index: usize, target: Address },
    #[error("Call {index} reverted: {source}")]
    CallReverted {
        index: usize,
        #[source]
        source: Box<ContractError>,
    },
}
