//! Cross-chain unshield walkthrough.
//!
//! Plans an unshield from the home-chain pool to a receiver on Ethereum, then
//! runs the resulting relay calls against the local contract simulation, once
//! with a healthy destination and once with one that reverts.
//!
//! Run with: cargo run --example cross_chain_unshield

use std::collections::BTreeMap;

use ethers::types::{Address, Bytes, U256};
use shield_bridge::config::GasModel;
use shield_bridge::contracts::{
    DestinationBehavior, GatewayEvent, HomeChainBridgeAdapter, LocalGateway, RelayExecutor,
    TokenLedger,
};
use shield_bridge::{
    plan_transfer, Chain, ChainConfig, NetworkRegistry, PlaintextAddress, ProtocolConfig,
    RecipientSpec, RevertOptions, ShieldedAmount, ShieldedTransfer, WalletId,
};

fn registry() -> shield_bridge::Result<NetworkRegistry> {
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
            bridge_adapter: Address::repeat_byte(0xBA),
            source_adapter: Some(Address::repeat_byte(0x5A)),
            gas_token: Address::repeat_byte(0xE7),
            minimum_gas_limit: U256::from(200_000u64),
            gas_model: GasModel::Eip1559,
            evm_address: true,
            rpc_url: None,
        },
    );
    NetworkRegistry::new(
        ProtocolConfig {
            home_chain: Chain::ZetaChain,
            relay_contract: Address::repeat_byte(0x4E),
            unshield_fee_bps: 25,
            shield_fee_bps: 25,
            gas_limit_padding_bps: 2_000,
            public_relay_price_bump_bps: 1_000,
        },
        chains,
    )
}

fn main() -> shield_bridge::Result<()> {
    let registry = registry()?;
    let token = Address::repeat_byte(0x11);
    let refund = Address::repeat_byte(0x0A);

    // Step 1: Plan
    let intent = ShieldedTransfer {
        wallet: WalletId::from("alice"),
        amount: ShieldedAmount::new(token, U256::from(1_000_000u64))?,
        recipient: RecipientSpec::External {
            address: PlaintextAddress::from(Address::repeat_byte(0xCD)),
            destination: Chain::Ethereum,
        },
        destination_gas_limit: None,
        revert_options: Some(RevertOptions {
            revert_address: refund,
            call_on_revert: true,
            abort_address: Address::repeat_byte(0xAB),
            revert_message: Bytes::from(b"bridge failed".to_vec()),
            on_revert_gas_limit: U256::from(100_000u64),
        }),
        uses_public_relay: false,
    };
    let plan = plan_transfer(&registry, &intent)?;
    let Some(adjusted) = plan.fee_adjusted else {
        return Ok(());
    };

    println!("Step 1: plan");
    println!("   amount   {}", adjusted.original());
    println!("   fee      {} ({} bps)", adjusted.fee(), adjusted.fee_bps());
    println!("   bridged  {}", adjusted.amount());
    for (i, call) in plan.request.calls().iter().enumerate() {
        println!("   call {} -> {:?} ({} bytes)", i, call.target, call.calldata.len());
    }
    println!();

    // Step 2: Execute against both destination behaviors
    let relay_address = registry.protocol.relay_contract;
    let gateway_address = Address::repeat_byte(0x6A);
    let adapter = HomeChainBridgeAdapter::new(
        registry.chain(Chain::Ethereum)?.bridge_adapter,
        relay_address,
        gateway_address,
    );
    let relay = RelayExecutor::new(relay_address, adapter);

    for behavior in [DestinationBehavior::Succeed, DestinationBehavior::AlwaysRevert] {
        let mut ledger = TokenLedger::new();
        ledger.mint(token, relay_address, adjusted.amount())?;
        let mut gateway = LocalGateway::new(gateway_address, behavior);

        println!("Step 2: execute ({:?})", behavior);
        relay.execute(&mut ledger, &mut gateway, plan.request.calls())?;
        for event in gateway.events() {
            match event {
                GatewayEvent::Sent { id } => println!("   sent      {:?}", id),
                GatewayEvent::Delivered { id } => println!("   delivered {:?}", id),
                GatewayEvent::Refunded { to, amount, .. } => println!("   refunded  {} to {:?}", amount, to),
                GatewayEvent::AbortCalled { target, .. } => println!("   abort     {:?}", target),
            }
        }
        println!("   refund balance: {}", ledger.balance_of(token, refund));
        println!();
    }
    Ok(())
}
