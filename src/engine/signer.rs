//! Transaction submission.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Eip1559TransactionRequest, TransactionRequest, H256};
use tracing::info;

use crate::config::Chain;
use crate::error::{Result, ShieldBridgeError};
use crate::types::{GasDetails, PopulatedTransaction};

/// Signs and broadcasts a populated payload.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn submit(&self, chain: Chain, tx: PopulatedTransaction, gas: &GasDetails) -> Result<H256>;
}

/// Builds a typed transaction from [`GasDetails`] and sends it through an
/// ethers middleware stack (typically `SignerMiddleware<Provider<Http>, LocalWallet>`).
pub struct MiddlewareSigner<M> {
    client: Arc<M>,
    chain_id: u64,
}

impl<M> MiddlewareSigner<M> {
    pub fn new(client: Arc<M>, chain_id: u64) -> Self {
        Self { client, chain_id }
    }
}

/// Typed transaction for `tx` priced by `gas`.
pub fn typed_transaction(tx: &PopulatedTransaction, gas: &GasDetails, chain_id: u64) -> TypedTransaction {
    match *gas {
        GasDetails::Legacy { gas_estimate, gas_price } => TransactionRequest::new()
            .to(tx.to)
            .data(tx.data.clone())
            .value(tx.value)
            .gas(gas_estimate)
            .gas_price(gas_price)
            .chain_id(chain_id)
            .into(),
        GasDetails::Eip1559 {
            gas_estimate,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => Eip1559TransactionRequest::new()
            .to(tx.to)
            .data(tx.data.clone())
            .value(tx.value)
            .gas(gas_estimate)
            .max_fee_per_gas(max_fee_per_gas)
            .max_priority_fee_per_gas(max_priority_fee_per_gas)
            .chain_id(chain_id)
            .into(),
    }
}

#[async_trait]
impl<M> TransactionSigner for MiddlewareSigner<M>
where
    M: Middleware + 'static,
{
    async fn submit(&self, chain: Chain, tx: PopulatedTransaction, gas: &GasDetails) -> Result<H256> {
        let typed = typed_transaction(&tx, gas, self.chain_id);
        let pending = self
            .client
            .send_transaction(typed, None)
            .await
            .map_err(|e| ShieldBridgeError::submission(format!("send_transaction failed: {}", e)))?;
        let hash = *pending;
        info!(%chain, tx_hash = ?hash, "transaction submitted");
        Ok(hash)
    }
}
