//! Fixed-point U256 arithmetic for the ledger and risk math.
//!
//! Values are carried in WAD (18-decimal) fixed point. Every operation that
//! can overflow is checked and returns `None` instead of wrapping, so callers
//! surface overflow as an error rather than a corrupted balance.

use alloy::primitives::U256;

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Basis points denominator (10000 = 100%)
pub const BPS_DENOMINATOR: U256 = U256::from_limbs([10000u64, 0, 0, 0]);

/// Pre-computed powers of 10 for fast decimal conversion
const POW10: [u128; 39] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
    100_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000_000,
];

/// Fast power of 10 lookup (up to 10^38)
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    if exp < 39 {
        U256::from(POW10[exp as usize])
    } else {
        U256::from(10u64).pow(U256::from(exp))
    }
}

/// Convert a basis-point count to U256.
#[inline(always)]
pub fn bps(basis_points: u32) -> U256 {
    U256::from(basis_points)
}

/// `value * basis_points / 10000`, checked.
#[inline(always)]
pub fn mul_bps(value: U256, basis_points: u32) -> Option<U256> {
    Some(value.checked_mul(bps(basis_points))? / BPS_DENOMINATOR)
}

/// `value * (10000 + basis_points) / 10000`, checked.
///
/// Example: mul_bps_up(1000, 500) = 1050 (5% bonus)
#[inline(always)]
pub fn mul_bps_up(value: U256, basis_points: u32) -> Option<U256> {
    mul_bps(value, 10_000u32.checked_add(basis_points)?)
}

/// Value of `amount` token units at `price_wad` per whole token, in WAD.
///
/// Formula: amount * price_wad / 10^decimals
///
/// Example: 1000 USDC (6 decimals) at 1e18 = 1000 * 10^18 WAD
#[inline(always)]
pub fn value_wad(amount: U256, price_wad: U256, decimals: u8) -> Option<U256> {
    if amount.is_zero() || price_wad.is_zero() {
        return Some(U256::ZERO);
    }
    Some(amount.checked_mul(price_wad)? / pow10(decimals))
}

/// [`value_wad`] rounded up, so any non-zero amount at a non-zero price
/// is worth at least 1 wei.
#[inline(always)]
pub fn value_wad_up(amount: U256, price_wad: U256, decimals: u8) -> Option<U256> {
    if amount.is_zero() || price_wad.is_zero() {
        return Some(U256::ZERO);
    }
    let product = amount.checked_mul(price_wad)?;
    let scale = pow10(decimals);
    let value = product / scale;
    if (product % scale).is_zero() {
        Some(value)
    } else {
        Some(value + U256::from(1u64))
    }
}

/// Token units worth `value` WAD at `price_wad` per whole token.
///
/// Inverse of [`value_wad`], rounding down. `None` on a zero price.
#[inline(always)]
pub fn amount_from_value_wad(value: U256, price_wad: U256, decimals: u8) -> Option<U256> {
    if price_wad.is_zero() {
        return None;
    }
    Some(value.checked_mul(pow10(decimals))? / price_wad)
}

/// Safety factor in WAD.
/// SF = (collateral * threshold_bps * 10^18) / (debt * 10000)
///
/// Returns U256::MAX if debt is zero.
#[inline(always)]
pub fn safety_factor_wad(collateral_wad: U256, debt_wad: U256, threshold_bps: u32) -> Option<U256> {
    if debt_wad.is_zero() {
        return Some(U256::MAX);
    }
    let numerator = collateral_wad.checked_mul(bps(threshold_bps))?.checked_mul(WAD)?;
    let denominator = debt_wad.checked_mul(BPS_DENOMINATOR)?;
    Some(numerator / denominator)
}

/// Convert WAD (18 decimals) to f64.
/// Use only for display/logging, not for computation.
#[inline(always)]
pub fn wad_to_f64(wad: U256) -> f64 {
    if wad == U256::MAX {
        return f64::INFINITY;
    }
    if wad <= U256::from(u128::MAX) {
        let value: u128 = wad.to();
        value as f64 / 1e18
    } else {
        let limbs = wad.as_limbs();
        let high = limbs[1] as f64 * (u64::MAX as f64 + 1.0);
        let low = limbs[0] as f64;
        (high + low) / 1e18
    }
}

/// Convert a decimal amount (e.g. 7.5) to token units with `decimals`.
/// Use for converting human input, never for ledger arithmetic.
pub fn units(value: f64, decimals: u8) -> U256 {
    if value <= 0.0 {
        return U256::ZERO;
    }
    // Go through micro-units to keep short literals like 7.52 exact
    let micros = (value * 1e6).round() as u128;
    if decimals >= 6 {
        U256::from(micros) * pow10(decimals - 6)
    } else {
        U256::from(micros) / pow10(6 - decimals)
    }
}
