//! Bridge Planner CLI.
//!
//! Prints the fee-adjusted amount and the relay calls for a cross-chain
//! unshield, without touching the network.
//!
//! Usage:
//!   cargo run --bin plan-bridge -- --config networks.json --destination ethereum \
//!       --token 0x... --amount 1000000 --receiver 0x... --refund 0x... [--gas-limit 250000]
//!
//! `--config` falls back to `SHIELD_BRIDGE_CONFIG`.

use std::env;
use std::process;

use ethers::types::{Address, U256};
use shield_bridge::{
    plan_transfer, Chain, NetworkRegistry, PlaintextAddress, RecipientSpec, RevertOptions,
    ShieldBridgeError, ShieldedAmount, ShieldedTransfer, WalletId,
};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Args {
    config: Option<String>,
    destination: String,
    token: String,
    amount: String,
    receiver: String,
    refund: String,
    gas_limit: Option<String>,
}

fn parse_args() -> Args {
    let argv: Vec<String> = env::args().collect();
    let mut args = Args::default();

    let mut i = 1;
    while i < argv.len() {
        let value = argv.get(i + 1).cloned();
        match (argv[i].as_str(), value) {
            ("--config", Some(v)) => args.config = Some(v),
            ("--destination", Some(v)) => args.destination = v,
            ("--token", Some(v)) => args.token = v,
            ("--amount", Some(v)) => args.amount = v,
            ("--receiver", Some(v)) => args.receiver = v,
            ("--refund", Some(v)) => args.refund = v,
            ("--gas-limit", Some(v)) => args.gas_limit = Some(v),
            _ => {
                i += 1;
                continue;
            }
        }
        i += 2;
    }
    args
}

fn address(name: &str, value: &str) -> Result<Address, ShieldBridgeError> {
    value
        .parse()
        .map_err(|_| ShieldBridgeError::invalid_input(format!("{} is not an address: {}", name, value)))
}

fn uint(name: &str, value: &str) -> Result<U256, ShieldBridgeError> {
    U256::from_dec_str(value)
        .map_err(|_| ShieldBridgeError::invalid_input(format!("{} is not a decimal integer: {}", name, value)))
}

fn run(args: Args) -> Result<(), ShieldBridgeError> {
    let registry = match &args.config {
        Some(path) => NetworkRegistry::from_path(path)?,
        None => NetworkRegistry::from_env()?,
    };
    let destination: Chain = args.destination.parse()?;
    let receiver = hex::decode(args.receiver.trim_start_matches("0x"))
        .map_err(|e| ShieldBridgeError::invalid_input(format!("receiver is not hex: {}", e)))?;

    let intent = ShieldedTransfer {
        wallet: WalletId::from("plan"),
        amount: ShieldedAmount::new(address("token", &args.token)?, uint("amount", &args.amount)?)?,
        recipient: RecipientSpec::External {
            address: PlaintextAddress::from_bytes(receiver)?,
            destination,
        },
        destination_gas_limit: args.gas_limit.as_deref().map(|v| uint("gas-limit", v)).transpose()?,
        revert_options: Some(RevertOptions::refund_to(address("refund", &args.refund)?)),
        uses_public_relay: false,
    };

    let plan = plan_transfer(&registry, &intent)?;
    if let Some(adjusted) = plan.fee_adjusted {
        println!("Amount:        {}", adjusted.original());
        println!("Fee ({} bps):  {}", adjusted.fee_bps(), adjusted.fee());
        println!("Received:      {}", adjusted.amount());
    }
    if let Some(route) = &plan.route {
        println!("Destination:   {} (gas limit {})", route.destination, route.gas_limit);
    }
    for (index, call) in plan.request.calls().iter().enumerate() {
        println!("Call {}:", index);
        println!("  target:   {:?}", call.target);
        println!("  calldata: 0x{}", hex::encode(&call.calldata));
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = parse_args();
    if args.destination.is_empty() || args.token.is_empty() || args.amount.is_empty() || args.receiver.is_empty() || args.refund.is_empty() {
        eprintln!("Usage: plan-bridge [--config <path>] --destination <chain> --token <address> --amount <units> --receiver <hex> --refund <address> [--gas-limit <units>]");
        process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Failed to plan bridge transfer: {}", e);
        process::exit(1);
    }
}
