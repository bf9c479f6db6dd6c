//! Core value types flowing through the orchestrator.
//!
//! Every user action creates fresh immutable values here; nothing is persisted
//! or mutated across pipeline attempts. Key material implements `Zeroize`.

use core::fmt;

use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::Chain;
use crate::error::{Result, ShieldBridgeError};

/// Identifier of a wallet known to the proving engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WalletId(String);

impl WalletId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WalletId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Password-derived key the proving engine uses to decrypt a wallet's notes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes (use with caution).
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// A token amount drawn from the shielded balance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawShieldedAmount")]
pub struct ShieldedAmount {
    token: Address,
    amount: U256,
}

#[derive(Deserialize)]
struct RawShieldedAmount {
    token: Address,
    amount: U256,
}

impl TryFrom<RawShieldedAmount> for ShieldedAmount {
    type Error = ShieldBridgeError;

    fn try_from(raw: RawShieldedAmount) -> Result<Self> {
        Self::new(raw.token, raw.amount)
    }
}

impl ShieldedAmount {
    /// Create an amount, rejecting zero values and the zero token address.
    pub fn new(token: Address, amount: U256) -> Result<Self> {
        if token.is_zero() {
            return Err(ShieldBridgeError::invalid_input("token address must not be zero"));
        }
        if amount.is_zero() {
            return Err(ShieldBridgeError::invalid_input("amount must be greater than zero"));
        }
        Ok(Self { token, amount })
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }
}

/// Amount left after the protocol fee was taken.
///
/// Only `fee::apply_unshield_fee` builds these, so a pre-fee amount can never be
/// passed where a post-fee amount is expected. Serialize-only for the same reason.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeeAdjustedAmount {
    token: Address,
    original: U256,
    amount: U256,
    fee_bps: u16,
}

impl FeeAdjustedAmount {
    pub(crate) fn new(token: Address, original: U256, amount: U256, fee_bps: u16) -> Self {
        Self { token, original, amount, fee_bps }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    /// Amount after the fee.
    pub fn amount(&self) -> U256 {
        self.amount
    }

    /// Amount before the fee, for display only.
    pub fn original(&self) -> U256 {
        self.original
    }

    pub fn fee(&self) -> U256 {
        self.original.saturating_sub(self.amount)
    }

    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }
}

/// Address inside the shielded pool (`0zk...`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ShieldedAddress(String);

impl TryFrom<String> for ShieldedAddress {
    type Error = ShieldBridgeError;

    fn try_from(address: String) -> Result<Self> {
        Self::parse(&address)
    }
}

impl ShieldedAddress {
    pub const PREFIX: &'static str = "0zk";

    pub fn parse(address: &str) -> Result<Self> {
        let body = address.strip_prefix(Self::PREFIX).ok_or_else(|| {
            ShieldBridgeError::invalid_input(format!(
                "shielded address must start with {}",
                Self::PREFIX
            ))
        })?;
        if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ShieldBridgeError::invalid_input("malformed shielded address"));
        }
        Ok(Self(address.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShieldedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plaintext receiver on some chain, kept as raw bytes so non-EVM chains fit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Bytes")]
pub struct PlaintextAddress(Bytes);

impl TryFrom<Bytes> for PlaintextAddress {
    type Error = ShieldBridgeError;

    fn try_from(bytes: Bytes) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

impl PlaintextAddress {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ShieldBridgeError::invalid_input("receiver must not be empty"));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    /// Interpret as an EVM address; fails unless exactly 20 bytes.
    pub fn to_evm(&self) -> Result<Address> {
        if self.0.len() != 20 {
            return Err(ShieldBridgeError::invalid_input(format!(
                "EVM receiver must be 20 bytes, got {}",
                self.0.len()
            )));
        }
        Ok(Address::from_slice(&self.0))
    }
}

impl From<Address> for PlaintextAddress {
    fn from(address: Address) -> Self {
        Self(Bytes::from(address.as_bytes().to_vec()))
    }
}

/// Who receives the value. Exactly one variant per operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientSpec {
    Internal(ShieldedAddress),
    External {
        address: PlaintextAddress,
        destination: Chain,
    },
}

/// One call the relay contract executes after unshielding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossContractCall {
    pub target: Address,
    pub calldata: Bytes,
    pub value: U256,
}

/// Gas estimate plus the fields that determine its price.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasDetails {
    /// Type 0/1 transactions.
    Legacy { gas_estimate: U256, gas_price: U256 },
    /// Type 2 transactions.
    Eip1559 {
        gas_estimate: U256,
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl GasDetails {
    pub fn gas_estimate(&self) -> U256 {
        match self {
            Self::Legacy { gas_estimate, .. } | Self::Eip1559 { gas_estimate, .. } => *gas_estimate,
        }
    }

    /// Same pricing, different gas estimate.
    pub fn with_gas_estimate(self, estimate: U256) -> Self {
        match self {
            Self::Legacy { gas_price, .. } => Self::Legacy {
                gas_estimate: estimate,
                gas_price,
            },
            Self::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                ..
            } => Self::Eip1559 {
                gas_estimate: estimate,
                max_fee_per_gas,
                max_priority_fee_per_gas,
            },
        }
    }

    /// Upper bound on what the transaction can cost.
    pub fn max_cost(&self) -> U256 {
        match self {
            Self::Legacy { gas_estimate, gas_price } => gas_estimate.saturating_mul(*gas_price),
            Self::Eip1559 {
                gas_estimate,
                max_fee_per_gas,
                ..
            } => gas_estimate.saturating_mul(*max_fee_per_gas),
        }
    }
}

/// What the gateway does if the destination-chain leg fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertOptions {
    pub revert_address: Address,
    pub call_on_revert: bool,
    pub abort_address: Address,
    pub revert_message: Bytes,
    pub on_revert_gas_limit: U256,
}

impl RevertOptions {
    /// Refund to `revert_address` with no callbacks.
    pub fn refund_to(revert_address: Address) -> Self {
        Self {
            revert_address,
            call_on_revert: false,
            abort_address: Address::zero(),
            revert_message: Bytes::new(),
            on_revert_gas_limit: U256::zero(),
        }
    }

    /// ABI tuple `(address,bool,address,bytes,uint256)`.
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.revert_address),
            Token::Bool(self.call_on_revert),
            Token::Address(self.abort_address),
            Token::Bytes(self.revert_message.to_vec()),
            Token::Uint(self.on_revert_gas_limit),
        ])
    }

    pub fn from_token(token: Token) -> Option<Self> {
        let Token::Tuple(fields) = token else {
            return None;
        };
        match fields.as_slice() {
            [Token::Address(revert_address), Token::Bool(call_on_revert), Token::Address(abort_address), Token::Bytes(revert_message), Token::Uint(on_revert_gas_limit)] => {
                Some(Self {
                    revert_address: *revert_address,
                    call_on_revert: *call_on_revert,
                    abort_address: *abort_address,
                    revert_message: Bytes::from(revert_message.clone()),
                    on_revert_gas_limit: *on_revert_gas_limit,
                })
            }
            _ => None,
        }
    }
}

/// Ready-to-sign payload produced by the proving engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulatedTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}
