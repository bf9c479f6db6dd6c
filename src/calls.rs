//! Cross-contract call assembly.
//!
//! Builds the ordered calls the relay contract executes after unshielding a
//! bridged amount: push the tokens to the bridge adapter, then ask the adapter
//! to withdraw them to the destination chain. The order is load-bearing; the
//! adapter checks its own balance when `withdraw` runs.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};

use crate::config::{Chain, NetworkRegistry};
use crate::error::{Result, ShieldBridgeError};
use crate::types::{CrossContractCall, FeeAdjustedAmount, PlaintextAddress, RevertOptions};

/// ERC-20 `transfer(address,uint256)`.
pub const TRANSFER_FN: &str = "transfer";

/// Bridge adapter `withdraw(bytes,uint256,address,address,uint256,(address,bool,address,bytes,uint256))`.
pub const WITHDRAW_FN: &str = "withdraw";

/// Number of calls in a bridge withdrawal.
pub const BRIDGE_CALL_COUNT: usize = 2;

fn transfer_params() -> Vec<ParamType> {
    vec![ParamType::Address, ParamType::Uint(256)]
}

fn revert_options_param() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Address,
        ParamType::Bool,
        ParamType::Address,
        ParamType::Bytes,
        ParamType::Uint(256),
    ])
}

fn withdraw_params() -> Vec<ParamType> {
    vec![
        ParamType::Bytes,
        ParamType::Uint(256),
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint(256),
        revert_options_param(),
    ]
}

pub fn transfer_selector() -> [u8; 4] {
    abi::short_signature(TRANSFER_FN, &transfer_params())
}

pub fn withdraw_selector() -> [u8; 4] {
    abi::short_signature(WITHDRAW_FN, &withdraw_params())
}

fn with_selector(selector: [u8; 4], tokens: &[Token]) -> Bytes {
    let mut data = Vec::with_capacity(4 + 32 * tokens.len());
    data.extend_from_slice(&selector);
    data.extend_from_slice(&abi::encode(tokens));
    Bytes::from(data)
}

fn strip_selector(selector: [u8; 4], data: &[u8]) -> Result<&[u8]> {
    match data.split_first_chunk::<4>() {
        Some((head, rest)) if *head == selector => Ok(rest),
        _ => Err(ShieldBridgeError::invalid_input("calldata selector mismatch")),
    }
}

/// Calldata for `transfer(to, amount)`.
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    with_selector(transfer_selector(), &[Token::Address(to), Token::Uint(amount)])
}

pub fn decode_transfer(data: &[u8]) -> Result<(Address, U256)> {
    let body = strip_selector(transfer_selector(), data)?;
    let tokens = abi::decode(&transfer_params(), body)
        .map_err(|e| ShieldBridgeError::invalid_input(format!("bad transfer calldata: {}", e)))?;
    match tokens.as_slice() {
        [Token::Address(to), Token::Uint(amount)] => Ok((*to, *amount)),
        _ => Err(ShieldBridgeError::invalid_input("bad transfer calldata")),
    }
}

/// Arguments of the bridge adapter's `withdraw`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawArgs {
    pub receiver: Bytes,
    pub amount: U256,
    pub source_token: Address,
    pub destination_token: Address,
    pub gas_limit: U256,
    pub revert_options: RevertOptions,
}

impl WithdrawArgs {
    pub fn encode(&self) -> Bytes {
        with_selector(
            withdraw_selector(),
            &[
                Token::Bytes(self.receiver.to_vec()),
                Token::Uint(self.amount),
                Token::Address(self.source_token),
                Token::Address(self.destination_token),
                Token::Uint(self.gas_limit),
                self.revert_options.to_token(),
            ],
        )
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let body = strip_selector(withdraw_selector(), data)?;
        let tokens = abi::decode(&withdraw_params(), body)
            .map_err(|e| ShieldBridgeError::invalid_input(format!("bad withdraw calldata: {}", e)))?;
        let mut tokens = tokens.into_iter();

        let receiver = tokens.next().and_then(Token::into_bytes);
        let amount = tokens.next().and_then(Token::into_uint);
        let source_token = tokens.next().and_then(Token::into_address);
        let destination_token = tokens.next().and_then(Token::into_address);
        let gas_limit = tokens.next().and_then(Token::into_uint);
        let revert_options = tokens.next().and_then(RevertOptions::from_token);

        match (receiver, amount, source_token, destination_token, gas_limit, revert_options) {
            (Some(receiver), Some(amount), Some(source_token), Some(destination_token), Some(gas_limit), Some(revert_options)) => {
                Ok(Self {
                    receiver: Bytes::from(receiver),
                    amount,
                    source_token,
                    destination_token,
                    gas_limit,
                    revert_options,
                })
            }
            _ => Err(ShieldBridgeError::invalid_input("bad withdraw calldata")),
        }
    }
}

/// Build `[transfer, withdraw]` for a bridged unshield.
///
/// Always returns exactly [`BRIDGE_CALL_COUNT`] calls: the first targets the
/// unshielded token, the second the bridge adapter.
pub fn assemble_bridge_calls(
    amount: &FeeAdjustedAmount,
    bridge_adapter: Address,
    destination_token: Address,
    receiver: &PlaintextAddress,
    gas_limit: U256,
    revert_options: &RevertOptions,
) -> Vec<CrossContractCall> {
    let transfer = CrossContractCall {
        target: amount.token(),
        calldata: encode_transfer(bridge_adapter, amount.amount()),
        value: U256::zero(),
    };

    let withdraw = CrossContractCall {
        target: bridge_adapter,
        calldata: WithdrawArgs {
            receiver: receiver.as_bytes().clone(),
            amount: amount.amount(),
            source_token: amount.token(),
            destination_token,
            gas_limit,
            revert_options: revert_options.clone(),
        }
        .encode(),
        value: U256::zero(),
    };

    vec![transfer, withdraw]
}

/// Pick the destination-leg gas limit: the chain minimum unless a higher bound is given.
pub fn resolve_gas_limit(requested: Option<U256>, minimum: U256) -> Result<U256> {
    match requested {
        None => Ok(minimum),
        Some(limit) if limit >= minimum => Ok(limit),
        Some(limit) => Err(ShieldBridgeError::invalid_input(format!(
            "destination gas limit {} is below the chain minimum {}",
            limit, minimum
        ))),
    }
}

/// Everything the assembler needs about a destination, resolved from the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeRoute {
    pub destination: Chain,
    pub bridge_adapter: Address,
    pub destination_token: Address,
    pub gas_limit: U256,
}

impl BridgeRoute {
    pub fn resolve(
        registry: &NetworkRegistry,
        destination: Chain,
        receiver: &PlaintextAddress,
        requested_gas_limit: Option<U256>,
    ) -> Result<Self> {
        if destination == registry.home_chain() {
            return Err(ShieldBridgeError::invalid_input(
                "destination is the home chain; no bridge route needed",
            ));
        }
        let config = registry.chain(destination)?;
        if config.evm_address {
            receiver.to_evm()?;
        }
        Ok(Self {
            destination,
            bridge_adapter: config.bridge_adapter,
            destination_token: config.gas_token,
            gas_limit: resolve_gas_limit(requested_gas_limit, config.minimum_gas_limit)?,
        })
    }

    pub fn assemble(
        &self,
        amount: &FeeAdjustedAmount,
        receiver: &PlaintextAddress,
        revert_options: &RevertOptions,
    ) -> Vec<CrossContractCall> {
        assemble_bridge_calls(
            amount,
            self.bridge_adapter,
            self.destination_token,
            receiver,
            self.gas_limit,
            revert_options,
        )
    }
}
