//! Source-chain adapter.
//!
//! `shieldOnHomeChain(ShieldRequest[]) payable`: takes a public deposit and
//! forwards it through the gateway to the home-chain bridge adapter, which
//! shields it into the pool. Holds no state between calls.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use tracing::info;

use super::{CallContext, ContractError, GatewayReceipt, MessagingGateway, TokenLedger, NATIVE_TOKEN};
use crate::fee::expected_shielded_amount;
use crate::types::RevertOptions;

/// One note to create in the pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShieldRequest {
    /// Note public key of the recipient.
    pub recipient: [u8; 32],
    pub token: Address,
    pub amount: U256,
    /// Encrypted note data, opaque to the adapters.
    pub ciphertext: Bytes,
}

impl ShieldRequest {
    fn param() -> ParamType {
        ParamType::Tuple(vec![
            ParamType::FixedBytes(32),
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Bytes,
        ])
    }

    fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::FixedBytes(self.recipient.to_vec()),
            Token::Address(self.token),
            Token::Uint(self.amount),
            Token::Bytes(self.ciphertext.to_vec()),
        ])
    }

    fn from_token(token: Token) -> Option<Self> {
        let Token::Tuple(fields) = token else {
            return None;
        };
        match fields.as_slice() {
            [Token::FixedBytes(recipient), Token::Address(token), Token::Uint(amount), Token::Bytes(ciphertext)] => {
                Some(Self {
                    recipient: H256::from_slice(recipient).0,
                    token: *token,
                    amount: *amount,
                    ciphertext: Bytes::from(ciphertext.clone()),
                })
            }
            _ => None,
        }
    }

    /// ABI `(bytes32,address,uint256,bytes)[]`, the cross-chain payload.
    pub fn encode_batch(requests: &[ShieldRequest]) -> Bytes {
        let tokens = requests.iter().map(Self::to_token).collect();
        Bytes::from(abi::encode(&[Token::Array(tokens)]))
    }

    pub fn decode_batch(payload: &[u8]) -> Result<Vec<ShieldRequest>, ContractError> {
        let mut tokens = abi::decode(&[ParamType::Array(Box::new(Self::param()))], payload)
            .map_err(|e| ContractError::MalformedCalldata(e.to_string()))?;
        let Some(Token::Array(items)) = tokens.pop() else {
            return Err(ContractError::MalformedCalldata("expected request array".into()));
        };
        items
            .into_iter()
            .map(|item| {
                Self::from_token(item)
                    .ok_or_else(|| ContractError::MalformedCalldata("bad shield request".into()))
            })
            .collect()
    }
}

/// Validate a batch: non-empty, one asset, no zero amounts. Returns the asset and total.
pub(crate) fn batch_total(requests: &[ShieldRequest]) -> Result<(Address, U256), ContractError> {
    let first = requests.first().ok_or(ContractError::EmptyRequest)?;
    let mut total = U256::zero();
    for request in requests {
        if request.token != first.token {
            return Err(ContractError::MixedAssets);
        }
        if request.amount.is_zero() {
            return Err(ContractError::ZeroAmount);
        }
        total = total.checked_add(request.amount).ok_or(ContractError::Overflow)?;
    }
    Ok((first.token, total))
}

/// Result of a source-chain shield forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShieldForward {
    pub receipt: GatewayReceipt,
    pub token: Address,
    pub deposited: U256,
    /// What the pool will credit after the shield fee.
    pub expected_shielded: U256,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SourceChainAdapter {
    pub address: Address,
    /// Bridge adapter on the home chain that receives the message.
    pub home_adapter: Address,
    pub shield_fee_bps: u16,
}

impl SourceChainAdapter {
    pub fn new(address: Address, home_adapter: Address, shield_fee_bps: u16) -> Self {
        Self {
            address,
            home_adapter,
            shield_fee_bps,
        }
    }

    pub fn shield_on_home_chain(
        &self,
        ctx: CallContext,
        ledger: &mut TokenLedger,
        gateway: &mut dyn MessagingGateway,
        requests: &[ShieldRequest],
    ) -> Result<ShieldForward, ContractError> {
        // 1. Validate the batch
        let (token, total) = batch_total(requests)?;

        // 2. Take custody of the deposit
        if token == NATIVE_TOKEN {
            if ctx.value != total {
                return Err(ContractError::InvalidValue {
                    expected: total,
                    got: ctx.value,
                });
            }
            ledger.transfer(NATIVE_TOKEN, ctx.sender, self.address, total)?;
        } else {
            if !ctx.value.is_zero() {
                return Err(ContractError::InvalidValue {
                    expected: U256::zero(),
                    got: ctx.value,
                });
            }
            ledger.transfer_from(token, self.address, ctx.sender, self.address, total)?;
            ledger.approve(token, self.address, gateway.address(), total);
        }

        // 3. Forward; a failed delivery refunds the depositor
        let receipt = gateway.deposit_and_call(
            ledger,
            self.address,
            self.home_adapter,
            token,
            total,
            ShieldRequest::encode_batch(requests),
            &RevertOptions::refund_to(ctx.sender),
        )?;

        info!(message_id = ?receipt.message_id, requests = requests.len(), %total, "shield forwarded to home chain");
        Ok(ShieldForward {
            receipt,
            token,
            deposited: total,
            expected_shielded: expected_shielded_amount(total, self.shield_fee_bps),
        })
    }
}
