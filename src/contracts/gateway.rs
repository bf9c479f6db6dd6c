//! Cross-chain messaging gateway interface and a local simulation.
//!
//! The real gateway is an external system. [`LocalGateway`] reproduces the
//! parts the adapters depend on: custody of the forwarded asset, an outbox of
//! messages, and the revert policy applied when the destination leg fails.

use ethers::types::{Address, Bytes, H256, U256};
use sha3::{Digest, Keccak256};
use tracing::{debug, info};

use super::{ContractError, TokenLedger, NATIVE_TOKEN};
use crate::calls::WithdrawArgs;
use crate::types::RevertOptions;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Source chain → home chain, calling a contract there.
    DepositAndCall,
    /// Home chain → destination chain.
    Withdraw,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub id: H256,
    pub kind: MessageKind,
    pub sender: Address,
    pub receiver: Bytes,
    pub token: Address,
    pub amount: U256,
    pub destination_token: Option<Address>,
    pub gas_limit: U256,
    pub payload: Bytes,
    pub revert_options: RevertOptions,
}

/// What happened to a message by the time the gateway call returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Delivery happens asynchronously on the other chain.
    Pending,
    Delivered,
    Reverted { refunded_to: Address, amount: U256 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayReceipt {
    pub message_id: H256,
    pub outcome: DeliveryOutcome,
}

/// Observable side effects, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    Sent { id: H256 },
    Delivered { id: H256 },
    Refunded { id: H256, to: Address, amount: U256 },
    AbortCalled { id: H256, target: Address, message: Bytes, gas_limit: U256 },
}

pub trait MessagingGateway {
    fn address(&self) -> Address;

    /// Take custody of `amount` of `token` from `caller` and call `receiver`
    /// on the home chain with `payload`. Native value must already be held by
    /// `caller`.
    #[allow(clippy::too_many_arguments)]
    fn deposit_and_call(
        &mut self,
        ledger: &mut TokenLedger,
        caller: Address,
        receiver: Address,
        token: Address,
        amount: U256,
        payload: Bytes,
        revert_options: &RevertOptions,
    ) -> Result<GatewayReceipt, ContractError>;

    /// Pull `args.amount` of `args.source_token` from `caller` and deliver it
    /// to `args.receiver` on the chain of `args.destination_token`.
    fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        caller: Address,
        args: &WithdrawArgs,
    ) -> Result<GatewayReceipt, ContractError>;
}

/// How the simulated destination chain treats incoming withdrawals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DestinationBehavior {
    Succeed,
    AlwaysRevert,
}

#[derive(Clone, Debug)]
pub struct LocalGateway {
    address: Address,
    behavior: DestinationBehavior,
    nonce: u64,
    outbox: Vec<OutboundMessage>,
    events: Vec<GatewayEvent>,
}

impl LocalGateway {
    pub fn new(address: Address, behavior: DestinationBehavior) -> Self {
        Self {
            address,
            behavior,
            nonce: 0,
            outbox: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn outbox(&self) -> &[OutboundMessage] {
        &self.outbox
    }

    pub fn events(&self) -> &[GatewayEvent] {
        &self.events
    }

    fn next_id(&mut self, payload: &[u8]) -> H256 {
        self.nonce += 1;
        let mut hasher = Keccak256::new();
        hasher.update(self.address.as_bytes());
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(payload);
        H256::from_slice(&hasher.finalize())
    }

    /// Refund to `revert_address`; deliver `revert_message` to `abort_address`
    /// only when `call_on_revert` is set.
    fn apply_revert_policy(
        &mut self,
        ledger: &mut TokenLedger,
        id: H256,
        token: Address,
        amount: U256,
        options: &RevertOptions,
    ) -> Result<DeliveryOutcome, ContractError> {
        ledger.transfer(token, self.address, options.revert_address, amount)?;
        self.events.push(GatewayEvent::Refunded {
            id,
            to: options.revert_address,
            amount,
        });

        if options.call_on_revert {
            self.events.push(GatewayEvent::AbortCalled {
                id,
                target: options.abort_address,
                message: options.revert_message.clone(),
                gas_limit: options.on_revert_gas_limit,
            });
        }
        info!(message_id = ?id, refunded_to = ?options.revert_address, call_on_revert = options.call_on_revert, "destination leg reverted");

        Ok(DeliveryOutcome::Reverted {
            refunded_to: options.revert_address,
            amount,
        })
    }
}

impl MessagingGateway for LocalGateway {
    fn address(&self) -> Address {
        self.address
    }

    fn deposit_and_call(
        &mut self,
        ledger: &mut TokenLedger,
        caller: Address,
        receiver: Address,
        token: Address,
        amount: U256,
        payload: Bytes,
        revert_options: &RevertOptions,
    ) -> Result<GatewayReceipt, ContractError> {
        if amount.is_zero() {
            return Err(ContractError::ZeroAmount);
        }
        if token == NATIVE_TOKEN {
            ledger.transfer(token, caller, self.address, amount)?;
        } else {
            ledger.transfer_from(token, self.address, caller, self.address, amount)?;
        }

        let id = self.next_id(&payload);
        self.outbox.push(OutboundMessage {
            id,
            kind: MessageKind::DepositAndCall,
            sender: caller,
            receiver: Bytes::from(receiver.as_bytes().to_vec()),
            token,
            amount,
            destination_token: None,
            gas_limit: U256::zero(),
            payload,
            revert_options: revert_options.clone(),
        });
        self.events.push(GatewayEvent::Sent { id });
        debug!(message_id = ?id, %amount, "deposit_and_call queued");

        Ok(GatewayReceipt {
            message_id: id,
            outcome: DeliveryOutcome::Pending,
        })
    }

    fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        caller: Address,
        args: &WithdrawArgs,
    ) -> Result<GatewayReceipt, ContractError> {
        if args.amount.is_zero() {
            return Err(ContractError::ZeroAmount);
        }
        ledger.transfer_from(args.source_token, self.address, caller, self.address, args.amount)?;

        let id = self.next_id(&args.encode());
        self.outbox.push(OutboundMessage {
            id,
            kind: MessageKind::Withdraw,
            sender: caller,
            receiver: args.receiver.clone(),
            token: args.source_token,
            amount: args.amount,
            destination_token: Some(args.destination_token),
            gas_limit: args.gas_limit,
            payload: Bytes::new(),
            revert_options: args.revert_options.clone(),
        });
        self.events.push(GatewayEvent::Sent { id });

        let outcome = match self.behavior {
            DestinationBehavior::Succeed => {
                self.events.push(GatewayEvent::Delivered { id });
                DeliveryOutcome::Delivered
            }
            DestinationBehavior::AlwaysRevert => {
                self.apply_revert_policy(ledger, id, args.source_token, args.amount, &args.revert_options)?
            }
        };

        Ok(GatewayReceipt {
            message_id: id,
            outcome,
        })
    }
}
