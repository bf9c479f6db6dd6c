//! Relay-side execution of cross-contract calls.
//!
//! After a proof-verified unshield, the relay contract runs the call list in
//! order. Any failing call reverts the whole list.

use ethers::types::{Address, U256};
use tracing::{debug, warn};

use super::{
    CallContext, ContractError, GatewayReceipt, HomeChainBridgeAdapter, MessagingGateway,
    TokenLedger,
};
use crate::calls::{decode_transfer, transfer_selector, withdraw_selector, WithdrawArgs};
use crate::types::CrossContractCall;

/// What one call produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    Transferred,
    Withdrawn(GatewayReceipt),
}

#[derive(Copy, Clone, Debug)]
pub struct RelayExecutor {
    pub address: Address,
    pub bridge_adapter: HomeChainBridgeAdapter,
}

impl RelayExecutor {
    pub fn new(address: Address, bridge_adapter: HomeChainBridgeAdapter) -> Self {
        Self {
            address,
            bridge_adapter,
        }
    }

    /// Execute all `calls` or none of them.
    pub fn execute<G>(
        &self,
        ledger: &mut TokenLedger,
        gateway: &mut G,
        calls: &[CrossContractCall],
    ) -> Result<Vec<CallOutcome>, ContractError>
    where
        G: MessagingGateway + Clone,
    {
        let ledger_snapshot = ledger.clone();
        let gateway_snapshot = gateway.clone();

        let mut outcomes = Vec::with_capacity(calls.len());
        for (index, call) in calls.iter().enumerate() {
            match self.execute_one(ledger, gateway, index, call) {
                Ok(outcome) => outcomes.push(outcome),
                Err(source) => {
                    warn!(index, target = ?call.target, error = %source, "relay call reverted, rolling back");
                    *ledger = ledger_snapshot;
                    *gateway = gateway_snapshot;
                    return Err(match source {
                        unknown @ ContractError::UnknownCall { .. } => unknown,
                        source => ContractError::CallReverted {
                            index,
                            source: Box::new(source),
                        },
                    });
                }
            }
        }
        debug!(calls = calls.len(), "relay calls executed");
        Ok(outcomes)
    }

    fn execute_one<G>(
        &self,
        ledger: &mut TokenLedger,
        gateway: &mut G,
        index: usize,
        call: &CrossContractCall,
    ) -> Result<CallOutcome, ContractError>
    where
        G: MessagingGateway,
    {
        if !call.value.is_zero() {
            return Err(ContractError::InvalidValue {
                expected: U256::zero(),
                got: call.value,
            });
        }
        let data = call.calldata.as_ref();

        if call.target == self.bridge_adapter.address && data.starts_with(&withdraw_selector()) {
            let args = WithdrawArgs::decode(data)
                .map_err(|e| ContractError::MalformedCalldata(e.to_string()))?;
            let receipt =
                self.bridge_adapter
                    .withdraw(CallContext::from(self.address), ledger, gateway, &args)?;
            return Ok(CallOutcome::Withdrawn(receipt));
        }

        if data.starts_with(&transfer_selector()) {
            let (to, amount) =
                decode_transfer(data).map_err(|e| ContractError::MalformedCalldata(e.to_string()))?;
            ledger.transfer(call.target, self.address, to, amount)?;
            return Ok(CallOutcome::Transferred);
        }

        Err(ContractError::UnknownCall {
            index,
            target: call.target,
        })
    }
}
