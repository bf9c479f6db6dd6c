//! Orchestrator pipeline integration tests.
//!
//! Drives full shielded transfers through the orchestrator against recording
//! doubles of the proving engine, scanner, gas oracle and signer.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ethers::types::{Address, U256};

use shield_bridge::engine::progress_channel;
use shield_bridge::runtime::{Collaborators, PipelineStatus, Unproven};
use shield_bridge::{
    compute_batch_min_gas_price, Chain, PipelineStage, PlaintextAddress, RecipientSpec,
    RevertOptions, ShieldBridgeError, ShieldedAddress, ShieldedAmount, ShieldedTransfer, SyncGate,
    WalletId,
};

use common::{key, Harness, BRIDGE_ADAPTER, TOKEN};

fn cross_chain(wallet: &str) -> ShieldedTransfer {
    ShieldedTransfer {
        wallet: WalletId::from(wallet),
        amount: ShieldedAmount::new(TOKEN, U256::from(1_000_000u64)).unwrap(),
        recipient: RecipientSpec::External {
            address: PlaintextAddress::from(Address::repeat_byte(0xCD)),
            destination: Chain::Ethereum,
        },
        destination_gas_limit: None,
        revert_options: Some(RevertOptions::refund_to(Address::repeat_byte(0x0A))),
        uses_public_relay: false,
    }
}

fn pipeline_calls(wallet: &str) -> Vec<String> {
    ["refresh", "estimate_unproven_gas", "generate_proof", "populate_transaction", "submit"]
        .iter()
        .map(|call| format!("{}:{}", wallet, call))
        .collect()
}

#[tokio::test]
async fn test_cross_chain_unshield_end_to_end() {
    let harness = Harness::started().await;
    let (progress, mut updates) = progress_channel();

    let receipt = harness
        .orchestrator
        .execute(&cross_chain("alice"), &key(), progress)
        .await
        .unwrap();

    // 1,000,000 at 25 bps
    let adjusted = receipt.fee_adjusted.unwrap();
    assert_eq!(adjusted.amount(), U256::from(997_500u64));
    assert_eq!(adjusted.fee(), U256::from(2_500u64));

    assert_eq!(harness.journal.entries(), pipeline_calls("alice"));
    assert!(updates.has_changed().unwrap());
    assert_eq!(*updates.borrow_and_update(), 1.0);
    assert_eq!(
        harness.orchestrator.status(&WalletId::from("alice")),
        Some(PipelineStatus::Completed {
            tx_hash: receipt.tx_hash
        })
    );
}

#[tokio::test]
async fn test_populate_uses_the_gas_details_that_were_proven() {
    let harness = Harness::started().await;
    let (progress, _updates) = progress_channel();

    let receipt = harness
        .orchestrator
        .execute(&cross_chain("alice"), &key(), progress)
        .await
        .unwrap();

    let proof_prices = harness.engine.proof_prices.lock().unwrap().clone();
    let populate_calls = harness.engine.populate_calls.lock().unwrap().clone();
    let submissions = harness.signer.submissions.lock().unwrap().clone();
    assert_eq!(proof_prices.len(), 1);
    assert_eq!(populate_calls.len(), 1);

    let (populate_price, populate_gas) = populate_calls[0];
    assert_eq!(populate_price, proof_prices[0]);
    assert_eq!(compute_batch_min_gas_price(&populate_gas), proof_prices[0]);
    assert_eq!(submissions[0].2, populate_gas);
    assert_eq!(receipt.gas, populate_gas);

    // Home chain is legacy-priced; estimate padded by 20%
    assert_eq!(submissions[0].0, Chain::ZetaChain);
    assert_eq!(populate_gas.gas_estimate(), U256::from(1_200_000u64));
}

#[tokio::test]
async fn test_gas_rpc_failure_never_reaches_proof_generation() {
    let harness = Harness::started().await;
    harness.oracle.fail.store(true, Ordering::SeqCst);
    let (progress, _updates) = progress_channel();

    let err = harness
        .orchestrator
        .execute(&cross_chain("alice"), &key(), progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::GasPricing));
    assert!(matches!(err.root_cause(), ShieldBridgeError::Network { .. }));
    assert!(err.is_retryable());
    assert_eq!(harness.journal.count("estimate_unproven_gas"), 0);
    assert_eq!(harness.journal.count("generate_proof"), 0);
    assert!(matches!(
        harness.orchestrator.status(&WalletId::from("alice")),
        Some(PipelineStatus::Aborted {
            stage: Some(PipelineStage::GasPricing),
            ..
        })
    ));
}

#[tokio::test]
async fn test_same_wallet_pipelines_serialize() {
    let harness = Harness::started().await;
    let (first, _a) = progress_channel();
    let (second, _b) = progress_channel();
    let intent = cross_chain("alice");

    let (key_one, key_two) = (key(), key());
    let (one, two) = tokio::join!(
        harness.orchestrator.execute(&intent, &key_one, first),
        harness.orchestrator.execute(&intent, &key_two, second),
    );
    assert_ne!(one.unwrap().tx_hash, two.unwrap().tx_hash);

    let mut expected = pipeline_calls("alice");
    expected.extend(pipeline_calls("alice"));
    assert_eq!(harness.journal.entries(), expected);
}

#[tokio::test]
async fn test_different_wallets_run_concurrently() {
    let harness = Harness::started().await;
    let (first, _a) = progress_channel();
    let (second, _b) = progress_channel();
    let alice = cross_chain("alice");
    let bob = cross_chain("bob");

    let (key_one, key_two) = (key(), key());
    let (one, two) = tokio::join!(
        harness.orchestrator.execute(&alice, &key_one, first),
        harness.orchestrator.execute(&bob, &key_two, second),
    );
    one.unwrap();
    two.unwrap();

    let journal = &harness.journal;
    let bob_proving = journal.position("bob:generate_proof").unwrap();
    let alice_submitted = journal.position("alice:submit").unwrap();
    assert!(bob_proving < alice_submitted);
}

#[tokio::test]
async fn test_proof_failure_aborts_before_population() {
    let harness = Harness::started().await;
    harness.engine.fail_proof.store(true, Ordering::SeqCst);
    let (progress, _updates) = progress_channel();

    let err = harness
        .orchestrator
        .execute(&cross_chain("alice"), &key(), progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Proving));
    assert_eq!(harness.journal.count("populate_transaction"), 0);
    assert_eq!(harness.journal.count("submit"), 0);
}

#[tokio::test]
async fn test_submission_failure_is_terminal() {
    let harness = Harness::started().await;
    harness.signer.fail.store(true, Ordering::SeqCst);
    let (progress, _updates) = progress_channel();

    let err = harness
        .orchestrator
        .execute(&cross_chain("alice"), &key(), progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Submission));
    assert_eq!(harness.signer.submissions.lock().unwrap().len(), 1);
    assert_eq!(harness.journal.count("generate_proof"), 1);

    // A retry starts over from a fresh sync and proof
    harness.signer.fail.store(false, Ordering::SeqCst);
    let (progress, _updates) = progress_channel();
    harness
        .orchestrator
        .execute(&cross_chain("alice"), &key(), progress)
        .await
        .unwrap();
    assert_eq!(harness.journal.count("refresh"), 2);
    assert_eq!(harness.journal.count("generate_proof"), 2);
}

#[tokio::test]
async fn test_engine_must_be_ready() {
    let harness = Harness::new();
    let (progress, _updates) = progress_channel();

    let err = harness
        .orchestrator
        .execute(&cross_chain("alice"), &key(), progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Preparation));
    assert!(matches!(err.root_cause(), ShieldBridgeError::Engine { .. }));
    assert!(harness.journal.entries().is_empty());
    assert_eq!(harness.orchestrator.status(&WalletId::from("alice")), None);
}

#[tokio::test]
async fn test_invalid_receiver_rejected_before_network() {
    let harness = Harness::started().await;
    let mut intent = cross_chain("alice");
    intent.recipient = RecipientSpec::External {
        address: PlaintextAddress::from_bytes(vec![0xCD; 19]).unwrap(),
        destination: Chain::Ethereum,
    };
    let (progress, _updates) = progress_channel();

    let err = harness
        .orchestrator
        .execute(&intent, &key(), progress)
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), ShieldBridgeError::InvalidInput { .. }));
    assert!(!err.is_retryable());
    assert!(harness.journal.entries().is_empty());
    assert_eq!(harness.oracle.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_private_transfer_has_no_calls() {
    let harness = Harness::started().await;
    let mut intent = cross_chain("alice");
    intent.recipient = RecipientSpec::Internal(ShieldedAddress::parse("0zk1qybob").unwrap());
    intent.revert_options = None;

    let plan = harness.orchestrator.plan(&intent).unwrap();
    assert!(plan.request.calls().is_empty());
    assert!(plan.fee_adjusted.is_none());

    let (progress, _updates) = progress_channel();
    let receipt = harness
        .orchestrator
        .execute(&intent, &key(), progress)
        .await
        .unwrap();
    assert!(receipt.fee_adjusted.is_none());
}

#[tokio::test]
async fn test_plan_targets_configured_bridge_adapter() {
    let harness = Harness::started().await;
    let mut intent = cross_chain("alice");
    intent.destination_gas_limit = Some(U256::from(150_000u64));
    assert!(harness.orchestrator.plan(&intent).is_err());

    intent.destination_gas_limit = Some(U256::from(250_000u64));
    let plan = harness.orchestrator.plan(&intent).unwrap();
    let calls = plan.request.calls();
    assert_eq!(calls[0].target, TOKEN);
    assert_eq!(calls[1].target, BRIDGE_ADAPTER);
    assert_eq!(plan.route.unwrap().gas_limit, U256::from(250_000u64));
    assert_eq!(harness.orchestrator.status(&WalletId::from("alice")), None);
}

#[test]
fn test_zero_amount_intent_is_rejected_when_decoded() {
    let mut json = serde_json::to_value(cross_chain("alice")).unwrap();
    json["amount"]["amount"] = serde_json::to_value(U256::zero()).unwrap();
    assert!(serde_json::from_value::<ShieldedTransfer>(json.clone()).is_err());

    json["amount"]["amount"] = serde_json::to_value(U256::from(1_000_000u64)).unwrap();
    let intent: ShieldedTransfer = serde_json::from_value(json).unwrap();
    assert_eq!(intent, cross_chain("alice"));
}

#[tokio::test]
async fn test_gas_estimation_requires_an_opened_sync_gate() {
    let harness = Harness::started().await;
    let with = Collaborators {
        sync: Arc::new(SyncGate::new(harness.scanner.clone())),
        ..harness.collaborators.clone()
    };
    let plan = harness.orchestrator.plan(&cross_chain("alice")).unwrap();

    let err = Unproven::new(plan.request, false)
        .estimate_gas(&with, &key())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Sync));
    assert!(matches!(err.root_cause(), ShieldBridgeError::NotSynced { .. }));
    assert!(harness.journal.entries().is_empty());
    assert_eq!(harness.oracle.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_pipeline_is_recorded_as_aborted() {
    let harness = Harness::started().await;
    let intent = cross_chain("alice");
    let (progress, _updates) = progress_channel();

    // Proof generation takes 50ms.
    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        harness.orchestrator.execute(&intent, &key(), progress),
    )
    .await;
    assert!(outcome.is_err());
    assert_eq!(harness.journal.count("generate_proof"), 1);
    assert!(matches!(
        harness.orchestrator.status(&WalletId::from("alice")),
        Some(PipelineStatus::Aborted { stage: None, .. })
    ));

    let (progress, _updates) = progress_channel();
    harness
        .orchestrator
        .execute(&intent, &key(), progress)
        .await
        .unwrap();
    assert!(matches!(
        harness.orchestrator.status(&WalletId::from("alice")),
        Some(PipelineStatus::Completed { .. })
    ));
}

#[tokio::test]
async fn test_reset_waits_for_in_flight_pipeline() {
    let harness = Arc::new(Harness::started().await);
    let (progress, _updates) = progress_channel();

    let running = {
        let harness = harness.clone();
        tokio::spawn(async move {
            harness
                .orchestrator
                .execute(&cross_chain("alice"), &key(), progress)
                .await
        })
    };
    while harness.journal.count("generate_proof") == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    harness.lifecycle.reset().await.unwrap();
    assert_eq!(harness.journal.count("submit"), 1);
    running.await.unwrap().unwrap();
}
