//! Two-phase gas and price estimation.
//!
//! Phase one reads live fee parameters to seed the proving engine's unproven
//! estimate. Phase two combines that estimate with fresh pricing into the gas
//! details that get proven and signed. Any RPC failure aborts before a proof is
//! requested.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::U256;
use tracing::{debug, warn};

use crate::config::{Chain, GasModel, NetworkRegistry, BPS_DENOMINATOR};
use crate::error::{Result, ShieldBridgeError};
use crate::fee::mul_div;
use crate::types::GasDetails;

/// Live fee parameters of one chain.
#[async_trait]
pub trait GasOracle: Send + Sync {
    /// Legacy `eth_gasPrice`.
    async fn gas_price(&self) -> Result<U256>;

    /// `(max_fee_per_gas, max_priority_fee_per_gas)`.
    async fn eip1559_fees(&self) -> Result<(U256, U256)>;
}

/// [`GasOracle`] backed by any ethers middleware stack.
pub struct MiddlewareGasOracle<M> {
    client: Arc<M>,
}

impl<M> MiddlewareGasOracle<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M> GasOracle for MiddlewareGasOracle<M>
where
    M: Middleware + 'static,
{
    async fn gas_price(&self) -> Result<U256> {
        self.client
            .get_gas_price()
            .await
            .map_err(|e| ShieldBridgeError::network(format!("eth_gasPrice failed: {}", e)))
    }

    async fn eip1559_fees(&self) -> Result<(U256, U256)> {
        self.client
            .estimate_eip1559_fees(None)
            .await
            .map_err(|e| ShieldBridgeError::network(format!("fee history unavailable: {}", e)))
    }
}

/// Estimator over every configured chain's oracle.
pub struct GasEstimator {
    registry: Arc<NetworkRegistry>,
    oracles: BTreeMap<Chain, Arc<dyn GasOracle>>,
}

impl GasEstimator {
    pub fn new(registry: Arc<NetworkRegistry>) -> Self {
        Self {
            registry,
            oracles: BTreeMap::new(),
        }
    }

    pub fn with_oracle(mut self, chain: Chain, oracle: Arc<dyn GasOracle>) -> Self {
        self.oracles.insert(chain, oracle);
        self
    }

    fn oracle(&self, chain: Chain) -> Result<&Arc<dyn GasOracle>> {
        self.oracles
            .get(&chain)
            .ok_or_else(|| ShieldBridgeError::config(format!("no gas oracle for {}", chain)))
    }

    /// Read live pricing with no simulation. The returned estimate is zero;
    /// these details only seed the unproven estimate.
    pub async fn estimate_original(&self, chain: Chain, uses_public_relay: bool) -> Result<GasDetails> {
        let details = self.live_pricing(chain, U256::zero(), uses_public_relay).await?;
        debug!(%chain, uses_public_relay, ?details, "original gas details");
        Ok(details)
    }

    /// Combine the engine's unproven estimate with current pricing.
    pub async fn estimate_for_proof(
        &self,
        chain: Chain,
        unproven_estimate: U256,
        uses_public_relay: bool,
    ) -> Result<GasDetails> {
        if unproven_estimate.is_zero() {
            return Err(ShieldBridgeError::proof("proving engine returned a zero gas estimate"));
        }
        let padding = self.registry.protocol.gas_limit_padding_bps;
        let padded = mul_div(
            unproven_estimate,
            U256::from(BPS_DENOMINATOR as u32 + padding as u32),
            U256::from(BPS_DENOMINATOR),
        );
        let details = self.live_pricing(chain, padded, uses_public_relay).await?;
        debug!(%chain, %unproven_estimate, gas_limit = %padded, "final gas details");
        Ok(details)
    }

    async fn live_pricing(&self, chain: Chain, gas_estimate: U256, uses_public_relay: bool) -> Result<GasDetails> {
        let config = self.registry.chain(chain)?;
        let oracle = self.oracle(chain)?;
        let bump = if uses_public_relay {
            self.registry.protocol.public_relay_price_bump_bps
        } else {
            0
        };

        let details = match config.gas_model {
            GasModel::Legacy => {
                let gas_price = oracle.gas_price().await?;
                GasDetails::Legacy {
                    gas_estimate,
                    gas_price: bump_price(gas_price, bump),
                }
            }
            GasModel::Eip1559 => {
                let (max_fee, priority_fee) = oracle.eip1559_fees().await?;
                GasDetails::Eip1559 {
                    gas_estimate,
                    max_fee_per_gas: bump_price(max_fee, bump),
                    max_priority_fee_per_gas: bump_price(priority_fee, bump),
                }
            }
        };

        if compute_batch_min_gas_price(&details).is_zero() {
            warn!(%chain, "network reported a zero gas price");
            return Err(ShieldBridgeError::network(format!(
                "{} reported a zero gas price",
                chain
            )));
        }
        Ok(details)
    }
}

fn bump_price(price: U256, bump_bps: u16) -> U256 {
    if bump_bps == 0 {
        return price;
    }
    mul_div(
        price,
        U256::from(BPS_DENOMINATOR as u32 + bump_bps as u32),
        U256::from(BPS_DENOMINATOR),
    )
}

/// The scalar a proof commits to as its minimum acceptable gas price.
pub fn compute_batch_min_gas_price(details: &GasDetails) -> U256 {
    match details {
        GasDetails::Legacy { gas_price, .. } => *gas_price,
        GasDetails::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
    }
}
