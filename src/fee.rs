//! Fee calculation.
//!
//! Basis-point fees with floor division; truncation always favors the protocol.
//! Anything computed downstream of an unshield takes a [`FeeAdjustedAmount`],
//! never the nominal amount.

use ethers::types::{Address, U256, U512};

use crate::config::BPS_DENOMINATOR;
use crate::error::{Result, ShieldBridgeError};
use crate::types::{FeeAdjustedAmount, ShieldedAmount};

/// `amount * (10000 - bps) / 10000`, rounded down.
///
/// Rates at or above 10000 are clamped to a 100% fee.
pub fn apply_fee(amount: U256, basis_points: u16) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(basis_points);
    mul_div(amount, U256::from(keep), U256::from(BPS_DENOMINATOR))
}

/// `value * numerator / denominator` computed in 512 bits, saturating on overflow.
pub(crate) fn mul_div(value: U256, numerator: U256, denominator: U256) -> U256 {
    let product = value.full_mul(numerator) / U512::from(denominator);
    U256::try_from(product).unwrap_or(U256::MAX)
}

/// Apply the protocol unshield fee. The rate comes from configuration.
pub fn apply_unshield_fee(amount: &ShieldedAmount, fee_bps: u16) -> FeeAdjustedAmount {
    let after_fee = apply_fee(amount.amount(), fee_bps);
    FeeAdjustedAmount::new(amount.token(), amount.amount(), after_fee, fee_bps)
}

/// Amount that lands in the pool once a source-chain deposit is shielded.
pub fn expected_shielded_amount(deposit: U256, shield_fee_bps: u16) -> U256 {
    apply_fee(deposit, shield_fee_bps)
}

/// Reserves of a constant-product pool, as read on-chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolReserves {
    pub token_in: Address,
    pub token_out: Address,
    pub reserve_in: U256,
    pub reserve_out: U256,
}

/// Minimum acceptable output for swapping an unshielded amount.
///
/// The quote is computed from the fee-adjusted amount and then reduced by
/// `slippage_bps`.
pub fn quote_min_output(
    amount_in: &FeeAdjustedAmount,
    reserves: &PoolReserves,
    slippage_bps: u16,
) -> Result<U256> {
    if reserves.token_in == reserves.token_out {
        return Err(ShieldBridgeError::invalid_input(
            "source and destination token must differ",
        ));
    }
    if amount_in.token() != reserves.token_in {
        return Err(ShieldBridgeError::invalid_input(format!(
            "pool input token {:?} does not match unshielded token {:?}",
            reserves.token_in,
            amount_in.token()
        )));
    }
    if reserves.reserve_in.is_zero() || reserves.reserve_out.is_zero() {
        return Err(ShieldBridgeError::invalid_input("pool has no liquidity"));
    }
    if slippage_bps >= BPS_DENOMINATOR {
        return Err(ShieldBridgeError::invalid_input("slippage must be below 100%"));
    }

    let amount = amount_in.amount();
    let denominator = reserves
        .reserve_in
        .checked_add(amount)
        .ok_or_else(|| ShieldBridgeError::invalid_input("reserve overflow"))?;
    let quoted = mul_div(amount, reserves.reserve_out, denominator);
    Ok(apply_fee(quoted, slippage_bps))
}
