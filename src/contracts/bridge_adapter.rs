//! Home-chain bridge adapter.
//!
//! Outbound: `withdraw(...)`, called by the relay contract as the second leg
//! of a bridged unshield. Inbound: `on_call`, the gateway's delivery of a
//! source-chain shield. A single-shot forwarder in both directions; it never
//! inspects or retries destination-chain outcomes.

use ethers::types::{Address, Bytes, U256};
use tracing::{info, warn};

use super::source_adapter::{batch_total, ShieldRequest};
use super::{CallContext, ContractError, GatewayReceipt, MessagingGateway, TokenLedger};
use crate::calls::WithdrawArgs;

/// The shielded pool's shield entry point.
pub trait ShieldedPool {
    /// Pull the requested tokens from `from` and create the notes.
    fn shield(
        &mut self,
        ledger: &mut TokenLedger,
        from: Address,
        requests: &[ShieldRequest],
    ) -> Result<(), ContractError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HomeChainBridgeAdapter {
    pub address: Address,
    /// Only caller allowed to `withdraw`.
    pub relay: Address,
    /// Only caller allowed to deliver `on_call`.
    pub gateway: Address,
}

impl HomeChainBridgeAdapter {
    pub fn new(address: Address, relay: Address, gateway: Address) -> Self {
        Self {
            address,
            relay,
            gateway,
        }
    }

    pub fn withdraw(
        &self,
        ctx: CallContext,
        ledger: &mut TokenLedger,
        gateway: &mut dyn MessagingGateway,
        args: &WithdrawArgs,
    ) -> Result<GatewayReceipt, ContractError> {
        if ctx.sender != self.relay {
            warn!(caller = ?ctx.sender, "withdraw from non-relay caller");
            return Err(ContractError::Unauthorized(ctx.sender));
        }
        if args.amount.is_zero() {
            return Err(ContractError::ZeroAmount);
        }

        // Funds arrive through the preceding transfer call
        let available = ledger.balance_of(args.source_token, self.address);
        if available < args.amount {
            return Err(ContractError::InsufficientBalance {
                token: args.source_token,
                holder: self.address,
                required: args.amount,
                available,
            });
        }

        ledger.approve(args.source_token, self.address, gateway.address(), args.amount);
        let receipt = gateway.withdraw(ledger, self.address, args)?;
        info!(
            message_id = ?receipt.message_id,
            amount = %args.amount,
            call_on_revert = args.revert_options.call_on_revert,
            "withdraw forwarded to gateway"
        );
        Ok(receipt)
    }

    pub fn on_call(
        &self,
        ctx: CallContext,
        ledger: &mut TokenLedger,
        pool: &mut dyn ShieldedPool,
        token: Address,
        amount: U256,
        payload: &Bytes,
    ) -> Result<(), ContractError> {
        if ctx.sender != self.gateway {
            return Err(ContractError::Unauthorized(ctx.sender));
        }
        let requests = ShieldRequest::decode_batch(payload)?;
        let (request_token, total) = batch_total(&requests)?;
        if request_token != token {
            return Err(ContractError::MixedAssets);
        }
        if total != amount {
            return Err(ContractError::AmountMismatch {
                expected: amount,
                got: total,
            });
        }

        pool.shield(ledger, self.address, &requests)?;
        info!(requests = requests.len(), %amount, "shield delivered to pool");
        Ok(())
    }
}
