//! Typed network registry.
//!
//! All per-chain settings are keyed by [`Chain`] and resolved once when the
//! orchestrator is built, so no component re-parses chain names.

use std::collections::BTreeMap;
use std::path::Path;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShieldBridgeError};

/// Environment variable pointing at a JSON registry file.
pub const CONFIG_ENV_VAR: &str = "SHIELD_BRIDGE_CONFIG";

/// Default protocol unshield fee (0.25%).
pub const DEFAULT_UNSHIELD_FEE_BPS: u16 = 25;

/// Default protocol shield fee (0.25%).
pub const DEFAULT_SHIELD_FEE_BPS: u16 = 25;

/// Basis-point denominator.
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Chains the orchestrator knows how to talk about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    BnbChain,
    Polygon,
    Arbitrum,
    Base,
    ZetaChain,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Ethereum,
        Chain::BnbChain,
        Chain::Polygon,
        Chain::Arbitrum,
        Chain::Base,
        Chain::ZetaChain,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::BnbChain => "bnbchain",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Base => "base",
            Chain::ZetaChain => "zetachain",
        }
    }

    /// Env var overriding this chain's RPC URL, e.g. `ETHEREUM_RPC_URL`.
    pub fn rpc_env_var(&self) -> String {
        format!("{}_RPC_URL", self.name().to_uppercase())
    }
}

impl core::fmt::Display for Chain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::str::FromStr for Chain {
    type Err = ShieldBridgeError;

    fn from_str(name: &str) -> Result<Self> {
        let name = name.to_ascii_lowercase();
        Chain::ALL
            .into_iter()
            .find(|chain| chain.name() == name)
            .ok_or_else(|| ShieldBridgeError::config(format!("unknown chain {}", name)))
    }
}

/// How a chain prices gas.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasModel {
    Legacy,
    Eip1559,
}

/// Per-chain configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Home-chain bridge adapter that withdraws toward this chain.
    pub bridge_adapter: Address,
    /// Source-chain adapter deployed on this chain, if shielding from here is supported.
    #[serde(default)]
    pub source_adapter: Option<Address>,
    /// Home-chain representation of this chain's gas token.
    pub gas_token: Address,
    /// Lower bound for the destination-chain leg gas limit.
    pub minimum_gas_limit: U256,
    pub gas_model: GasModel,
    /// Receivers on this chain are 20-byte EVM addresses.
    #[serde(default = "default_true")]
    pub evm_address: bool,
    #[serde(default)]
    pub rpc_url: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Protocol-wide settings. Callers never supply fee rates themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Chain hosting the shielded pool.
    pub home_chain: Chain,
    /// Shielded pool relay contract on the home chain.
    pub relay_contract: Address,
    #[serde(default = "default_unshield_fee")]
    pub unshield_fee_bps: u16,
    #[serde(default = "default_shield_fee")]
    pub shield_fee_bps: u16,
    /// Padding added to the engine's unproven gas estimate.
    #[serde(default = "default_gas_padding")]
    pub gas_limit_padding_bps: u16,
    /// Gas price bump applied when a public relay submits the transaction.
    #[serde(default = "default_relay_bump")]
    pub public_relay_price_bump_bps: u16,
}

fn default_unshield_fee() -> u16 {
    DEFAULT_UNSHIELD_FEE_BPS
}

fn default_shield_fee() -> u16 {
    DEFAULT_SHIELD_FEE_BPS
}

fn default_gas_padding() -> u16 {
    2_000
}

fn default_relay_bump() -> u16 {
    1_000
}

/// Registry of every configured chain plus protocol settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRegistry {
    pub protocol: ProtocolConfig,
    pub chains: BTreeMap<Chain, ChainConfig>,
}

impl NetworkRegistry {
    /// Build and validate a registry.
    pub fn new(protocol: ProtocolConfig, chains: BTreeMap<Chain, ChainConfig>) -> Result<Self> {
        let registry = Self { protocol, chains };
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let registry: Self = serde_json::from_str(json)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load from the file named by `SHIELD_BRIDGE_CONFIG`, then apply
    /// `<CHAIN>_RPC_URL` overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .map_err(|_| ShieldBridgeError::config(format!("{} not set", CONFIG_ENV_VAR)))?;
        let mut registry = Self::from_path(path)?;

        for (chain, config) in registry.chains.iter_mut() {
            if let Ok(url) = std::env::var(chain.rpc_env_var()) {
                config.rpc_url = Some(url);
            }
        }
        Ok(registry)
    }

    pub fn validate(&self) -> Result<()> {
        let protocol = &self.protocol;
        for (name, bps) in [
            ("unshield_fee_bps", protocol.unshield_fee_bps),
            ("shield_fee_bps", protocol.shield_fee_bps),
        ] {
            if bps >= BPS_DENOMINATOR {
                return Err(ShieldBridgeError::config(format!(
                    "{} must be below {}, got {}",
                    name, BPS_DENOMINATOR, bps
                )));
            }
        }
        if protocol.relay_contract.is_zero() {
            return Err(ShieldBridgeError::config("relay_contract must be set"));
        }
        if !self.chains.contains_key(&protocol.home_chain) {
            return Err(ShieldBridgeError::config(format!(
                "home chain {} has no configuration",
                protocol.home_chain
            )));
        }

        for (chain, config) in &self.chains {
            if *chain != protocol.home_chain && config.bridge_adapter.is_zero() {
                return Err(ShieldBridgeError::config(format!(
                    "{}: bridge_adapter must be set",
                    chain
                )));
            }
            if config.minimum_gas_limit.is_zero() {
                return Err(ShieldBridgeError::config(format!(
                    "{}: minimum_gas_limit must be positive",
                    chain
                )));
            }
        }

        let mut seen = BTreeMap::new();
        for (chain, config) in &self.chains {
            if let Some(other) = seen.insert(config.chain_id, *chain) {
                return Err(ShieldBridgeError::config(format!(
                    "chain id {} used by both {} and {}",
                    config.chain_id, other, chain
                )));
            }
        }
        Ok(())
    }

    pub fn chain(&self, chain: Chain) -> Result<&ChainConfig> {
        self.chains
            .get(&chain)
            .ok_or_else(|| ShieldBridgeError::config(format!("chain {} is not configured", chain)))
    }

    pub fn home(&self) -> Result<&ChainConfig> {
        self.chain(self.protocol.home_chain)
    }

    pub fn home_chain(&self) -> Chain {
        self.protocol.home_chain
    }

    /// Resolve a numeric chain id back to its registry key.
    pub fn chain_for_id(&self, chain_id: u64) -> Option<Chain> {
        self.chains
            .iter()
            .find(|(_, config)| config.chain_id == chain_id)
            .map(|(chain, _)| *chain)
    }

    pub fn unshield_fee_bps(&self) -> u16 {
        self.protocol.unshield_fee_bps
    }

    pub fn shield_fee_bps(&self) -> u16 {
        self.protocol.shield_fee_bps
    }
}
