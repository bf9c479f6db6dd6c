//! Test doubles for the orchestrator's collaborators.
//!
//! Every double writes `"<wallet>:<call>"` into a shared [`Journal`] so tests
//! can assert on call order across pipelines.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H160, H256, U256};
use tokio::sync::{broadcast, watch};

use shield_bridge::config::{ChainConfig, GasModel};
use shield_bridge::engine::{
    BalanceUpdate, EngineBackend, EngineLifecycle, LedgerScanner, ProgressSender, ProofRequest,
    ProvingEngine, ScanProgress, TransactionSigner,
};
use shield_bridge::runtime::Collaborators;
use shield_bridge::{
    Chain, EncryptionKey, GasDetails, GasEstimator, GasOracle, NetworkRegistry, Orchestrator,
    PopulatedTransaction, ProtocolConfig, Result, ShieldBridgeError, WalletId,
};

pub const TOKEN: Address = H160([0x11; 20]);
pub const RELAY: Address = H160([0x4E; 20]);
pub const BRIDGE_ADAPTER: Address = H160([0xBA; 20]);
pub const ETH_GAS_TOKEN: Address = H160([0xE7; 20]);

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, wallet: &WalletId, call: &str) {
        self.0.lock().unwrap().push(format!("{}:{}", wallet, call));
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count(&self, call: &str) -> usize {
        self.entries().iter().filter(|e| e.ends_with(&format!(":{}", call))).count()
    }
}

pub fn registry() -> NetworkRegistry {
    let mut chains = BTreeMap::new();
    chains.insert(
        Chain::ZetaChain,
        ChainConfig {
            chain_id: 7000,
            bridge_adapter: Address::zero(),
            source_adapter: None,
            gas_token: Address::repeat_byte(0x70),
            minimum_gas_limit: U256::from(100_000u64),
            gas_model: GasModel::Legacy,
            evm_address: true,
            rpc_url: None,
        },
    );
    chains.insert(
        Chain::Ethereum,
        ChainConfig {
            chain_id: 1,
            bridge_adapter: BRIDGE_ADAPTER,
            source_adapter: Some(Address::repeat_byte(0x5A)),
            gas_token: ETH_GAS_TOKEN,
            minimum_gas_limit: U256::from(200_000u64),
            gas_model: GasModel::Eip1559,
            evm_address: true,
            rpc_url: None,
        },
    );
    NetworkRegistry::new(
        ProtocolConfig {
            home_chain: Chain::ZetaChain,
            relay_contract: RELAY,
            unshield_fee_bps: 25,
            shield_fee_bps: 25,
            gas_limit_padding_bps: 2_000,
            public_relay_price_bump_bps: 1_000,
        },
        chains,
    )
    .unwrap()
}

/// Proving engine that records what it was asked.
pub struct MockEngine {
    journal: Journal,
    pub unproven_estimate: U256,
    pub proof_delay: Duration,
    pub fail_proof: AtomicBool,
    pub proof_prices: Mutex<Vec<U256>>,
    pub populate_calls: Mutex<Vec<(U256, GasDetails)>>,
}

impl MockEngine {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            unproven_estimate: U256::from(1_000_000u64),
            proof_delay: Duration::from_millis(50),
            fail_proof: AtomicBool::new(false),
            proof_prices: Mutex::new(Vec::new()),
            populate_calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ProvingEngine for MockEngine {
    async fn estimate_unproven_gas(
        &self,
        request: &ProofRequest,
        _key: &EncryptionKey,
        original_gas: &GasDetails,
    ) -> Result<U256> {
        self.journal.record(&request.wallet, "estimate_unproven_gas");
        assert!(original_gas.gas_estimate().is_zero());
        Ok(self.unproven_estimate)
    }

    async fn generate_proof(
        &self,
        request: &ProofRequest,
        _key: &EncryptionKey,
        batch_min_gas_price: U256,
        progress: ProgressSender,
    ) -> Result<()> {
        self.journal.record(&request.wallet, "generate_proof");
        self.proof_prices.lock().unwrap().push(batch_min_gas_price);
        progress.report(0.25);
        tokio::time::sleep(self.proof_delay / 2).await;
        progress.report(0.75);
        tokio::time::sleep(self.proof_delay / 2).await;
        if self.fail_proof.load(Ordering::SeqCst) {
            return Err(ShieldBridgeError::proof("merkle root not found"));
        }
        Ok(())
    }

    async fn populate_transaction(
        &self,
        request: &ProofRequest,
        batch_min_gas_price: U256,
        gas: &GasDetails,
    ) -> Result<PopulatedTransaction> {
        self.journal.record(&request.wallet, "populate_transaction");
        self.populate_calls.lock().unwrap().push((batch_min_gas_price, *gas));
        // The wallet travels in the payload so the signer can journal it.
        Ok(PopulatedTransaction {
            to: RELAY,
            data: Bytes::from(request.wallet.as_str().as_bytes().to_vec()),
            value: U256::zero(),
        })
    }
}

#[derive(Default)]
pub struct NoopBackend;

#[async_trait]
impl EngineBackend for NoopBackend {
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn wipe_local_ledger(&self) -> Result<()> {
        Ok(())
    }
}

/// Scanner that replays `script` after each refresh, one step per `step_delay`.
pub struct ScriptedScanner {
    journal: Journal,
    progress: Arc<watch::Sender<ScanProgress>>,
    balances: broadcast::Sender<BalanceUpdate>,
    script: Vec<ScanProgress>,
    step_delay: Duration,
    reset_on_refresh: bool,
    pub refreshes: AtomicUsize,
}

impl ScriptedScanner {
    pub fn new(journal: Journal, script: Vec<ScanProgress>) -> Self {
        let (progress, _) = watch::channel(ScanProgress::default());
        let (balances, _) = broadcast::channel(16);
        Self {
            journal,
            progress: Arc::new(progress),
            balances,
            script,
            step_delay: Duration::from_millis(5),
            reset_on_refresh: true,
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Still reports the previous scan as complete when a refresh is accepted;
    /// the new scan only shows up after the first step delay.
    pub fn lagging(journal: Journal, script: Vec<ScanProgress>, step_delay: Duration) -> Self {
        let scanner = Self {
            step_delay,
            reset_on_refresh: false,
            ..Self::new(journal, script)
        };
        scanner.progress.send_replace(ScanProgress::COMPLETE);
        scanner
    }

    pub fn current(&self) -> ScanProgress {
        *self.progress.borrow()
    }

    /// Completes immediately on every refresh.
    pub fn instant(journal: Journal) -> Self {
        Self::new(journal, vec![ScanProgress::COMPLETE])
    }

    /// Drive progress by hand.
    pub fn push(&self, progress: ScanProgress) {
        self.progress.send_replace(progress);
    }
}

#[async_trait]
impl LedgerScanner for ScriptedScanner {
    fn scan_progress(&self, _chain: Chain) -> watch::Receiver<ScanProgress> {
        self.progress.subscribe()
    }

    fn balance_updates(&self) -> broadcast::Receiver<BalanceUpdate> {
        self.balances.subscribe()
    }

    async fn refresh(&self, wallet: &WalletId, chain: Chain) -> Result<()> {
        self.journal.record(wallet, "refresh");
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.reset_on_refresh {
            self.progress.send_replace(ScanProgress::default());
        }

        let script = self.script.clone();
        if script.is_empty() {
            return Ok(());
        }
        let progress = self.progress.clone();
        let balances = self.balances.clone();
        let delay = self.step_delay;
        let wallet = wallet.clone();
        tokio::spawn(async move {
            for step in script {
                tokio::time::sleep(delay).await;
                progress.send_replace(step);
            }
            let _ = balances.send(BalanceUpdate {
                wallet,
                chain,
                balances: vec![(TOKEN, U256::from(1_000_000u64))],
            });
        });
        Ok(())
    }
}

/// Gas oracle with fixed prices, optionally failing.
pub struct MockOracle {
    pub gas_price: U256,
    pub fees: (U256, U256),
    pub fail: AtomicBool,
    pub reads: AtomicUsize,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            gas_price: U256::from(10_000_000_000u64),
            fees: (U256::from(30_000_000_000u64), U256::from(1_000_000_000u64)),
            fail: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GasOracle for MockOracle {
    async fn gas_price(&self) -> Result<U256> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShieldBridgeError::network("eth_gasPrice: connection refused"));
        }
        Ok(self.gas_price)
    }

    async fn eip1559_fees(&self) -> Result<(U256, U256)> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShieldBridgeError::network("eth_feeHistory: connection refused"));
        }
        Ok(self.fees)
    }
}

/// Signer that records every submission.
pub struct MockSigner {
    journal: Journal,
    pub fail: AtomicBool,
    pub submissions: Mutex<Vec<(Chain, PopulatedTransaction, GasDetails)>>,
}

impl MockSigner {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail: AtomicBool::new(false),
            submissions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    async fn submit(&self, chain: Chain, tx: PopulatedTransaction, gas: &GasDetails) -> Result<H256> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push((chain, tx.clone(), *gas));
        let count = submissions.len();
        drop(submissions);

        let wallet = WalletId::new(String::from_utf8_lossy(&tx.data).into_owned());
        self.journal.record(&wallet, "submit");
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShieldBridgeError::submission("replacement transaction underpriced"));
        }
        Ok(H256::from_low_u64_be(count as u64))
    }
}

pub struct Harness {
    pub journal: Journal,
    pub engine: Arc<MockEngine>,
    pub scanner: Arc<ScriptedScanner>,
    pub oracle: Arc<MockOracle>,
    pub signer: Arc<MockSigner>,
    pub lifecycle: Arc<EngineLifecycle>,
    pub collaborators: Collaborators,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    /// Orchestrator over fresh doubles. The engine is not started.
    pub fn new() -> Self {
        let journal = Journal::default();
        let engine = Arc::new(MockEngine::new(journal.clone()));
        let scanner = Arc::new(ScriptedScanner::instant(journal.clone()));
        let oracle = Arc::new(MockOracle::new());
        let signer = Arc::new(MockSigner::new(journal.clone()));
        let registry = Arc::new(registry());

        let gas = GasEstimator::new(registry.clone())
            .with_oracle(Chain::ZetaChain, oracle.clone())
            .with_oracle(Chain::Ethereum, oracle.clone());
        let collaborators = Collaborators {
            engine: engine.clone(),
            gas: Arc::new(gas),
            signer: signer.clone(),
            sync: Arc::new(shield_bridge::SyncGate::new(scanner.clone())),
        };
        let lifecycle = Arc::new(EngineLifecycle::new(Arc::new(NoopBackend)));
        let orchestrator =
            Arc::new(Orchestrator::new(registry, collaborators.clone(), lifecycle.clone()).unwrap());

        Self {
            journal,
            engine,
            scanner,
            oracle,
            signer,
            lifecycle,
            collaborators,
            orchestrator,
        }
    }

    pub async fn started() -> Self {
        let harness = Self::new();
        harness.lifecycle.start().await.unwrap();
        harness
    }
}

pub fn key() -> EncryptionKey {
    EncryptionKey::from_bytes([0x42; 32])
}
