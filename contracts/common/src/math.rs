//! Fixed-Point Math for the Lending Core
//!
//! WAD (1e18) and RAY (1e27) arithmetic with explicit rounding direction.
//! Products are taken in 256 bits and checked back down to `u128`, so a
//! result that does not fit fails with `Overflow` instead of truncating.
//!
//! Rounding direction is part of the protocol: amounts owed *to* the
//! protocol round up, amounts credited *by* it round down.

use primitive_types::U256;

use crate::constants::{interest, precision::{BPS_DENOMINATOR, RAY, WAD, WAD_PER_BPS}, time};
use crate::errors::{CoolerError, CoolerResult};

/// Narrow a 256-bit value back to `u128`
pub fn to_u128(value: U256) -> CoolerResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(CoolerError::Overflow);
    }
    Ok(value.low_u128())
}

fn checked_product(a: u128, b: u128) -> CoolerResult<U256> {
    U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(CoolerError::Overflow)
}

/// `floor(a * b / d)`
pub fn mul_div_down(a: u128, b: u128, d: u128) -> CoolerResult<u128> {
    if d == 0 {
        return Err(CoolerError::DivisionByZero);
    }
    to_u128(checked_product(a, b)? / U256::from(d))
}

/// `ceil(a * b / d)`
pub fn mul_div_up(a: u128, b: u128, d: u128) -> CoolerResult<u128> {
    if d == 0 {
        return Err(CoolerError::DivisionByZero);
    }
    let product = checked_product(a, b)?;
    let d = U256::from(d);
    let quotient = product / d;
    if (product % d).is_zero() {
        to_u128(quotient)
    } else {
        to_u128(quotient + U256::one())
    }
}

/// `floor(a * b / WAD)`
pub fn mul_wad_down(a: u128, b: u128) -> CoolerResult<u128> {
    mul_div_down(a, b, WAD)
}

/// `ceil(a * b / WAD)`
pub fn mul_wad_up(a: u128, b: u128) -> CoolerResult<u128> {
    mul_div_up(a, b, WAD)
}

/// `floor(a * WAD / b)`
pub fn div_wad_down(a: u128, b: u128) -> CoolerResult<u128> {
    mul_div_down(a, WAD, b)
}

/// `ceil(a * WAD / b)`
pub fn div_wad_up(a: u128, b: u128) -> CoolerResult<u128> {
    mul_div_up(a, WAD, b)
}

/// Convert an annual rate in basis points to WAD per year
pub fn bps_to_wad(bps: u64) -> u128 {
    (bps as u128) * WAD_PER_BPS
}

/// `floor(amount * bps / 10_000)`
pub fn apply_bps(amount: u128, bps: u128) -> CoolerResult<u128> {
    mul_div_down(amount, bps, BPS_DENOMINATOR)
}

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> CoolerResult<u128> {
    a.checked_add(b).ok_or(CoolerError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> CoolerResult<u128> {
    a.checked_sub(b).ok_or(CoolerError::Underflow)
}

// ============ Continuous Compounding ============

/// `e^x` in RAY for an exponent given in WAD
///
/// Range reduction: halve `x` until it is at most 1, sum the Taylor series
/// there, then square back up. Every step rounds down and every term is
/// non-negative, so the result is never below one RAY.
pub fn exp_wad_to_ray(x_wad: u128) -> CoolerResult<U256> {
    if x_wad > interest::MAX_EXP_WAD {
        return Err(CoolerError::Overflow);
    }

    let ray = U256::from(RAY);
    // x in ray precision
    let mut x = U256::from(x_wad) * U256::from(RAY / WAD);

    let mut halvings = 0u32;
    while x > ray {
        x = x / U256::from(2u8);
        halvings += 1;
    }

    let mut sum = ray;
    let mut term = ray;
    for n in 1..=interest::MAX_EXP_TERMS {
        term = term * x / (ray * U256::from(n));
        if term.is_zero() {
            break;
        }
        sum += term;
    }

    for _ in 0..halvings {
        sum = sum.checked_mul(sum).ok_or(CoolerError::Overflow)? / ray;
    }

    Ok(sum)
}

/// Growth factor in RAY for `rate_wad` per year over `elapsed` seconds
pub fn compounding_factor_ray(rate_wad: u128, elapsed: u64) -> CoolerResult<U256> {
    if rate_wad == 0 || elapsed == 0 {
        return Ok(U256::from(RAY));
    }
    let exponent = mul_div_down(rate_wad, elapsed as u128, time::SECONDS_PER_YEAR as u128)?;
    exp_wad_to_ray(exponent)
}

/// `principal * e^(rate * elapsed / year)`, rounded down
pub fn continuously_compounded(principal: u128, rate_wad: u128, elapsed: u64) -> CoolerResult<u128> {
    let factor = compounding_factor_ray(rate_wad, elapsed)?;
    let scaled = U256::from(principal)
        .checked_mul(factor)
        .ok_or(CoolerError::Overflow)?;
    to_u128(scaled / U256::from(RAY))
}

/// Simple (non-compounding) interest: `ceil(principal * rate * duration / year)`
pub fn simple_interest_up(principal: u128, rate_bps: u64, duration: u64) -> CoolerResult<u128> {
    let annual = mul_div_up(principal, bps_to_wad(rate_bps), WAD)?;
    mul_div_up(annual, duration as u128, time::SECONDS_PER_YEAR as u128)
}
