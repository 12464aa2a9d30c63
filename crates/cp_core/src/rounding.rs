//! Integer-first proportional helpers.
//!
//! Rounding policy: **round half up** (ties go away from zero for the
//! non-negative operands used here), computed exactly as
//! `floor((2·num + den) / (2·den))`. No floating point is involved.

use crate::errors::CoreError;

/// `round_half_up(num / den)` for non-negative operands.
pub fn round_half_up_div(num: u128, den: u128) -> Result<u128, CoreError> {
    if den == 0 {
        return Err(CoreError::ZeroDenominator);
    }
    // Split to keep 2·num from overflowing: num = q·den + r, 0 <= r < den.
    let q = num / den;
    let r = num % den;
    // r/den >= 1/2  <=>  2r >= den ; 2r < 2·den fits whenever den fits.
    let bump = match r.checked_mul(2) {
        Some(twice) => twice >= den,
        None => true, // r > u128::MAX/2 implies r >= den/2
    };
    Ok(if bump { q + 1 } else { q })
}

/// `round_half_up(value × part / whole)`, the proportional share of `value`.
pub fn proportional_share(value: u128, part: u128, whole: u128) -> Result<u128, CoreError> {
    let num = value.checked_mul(part).ok_or(CoreError::Overflow)?;
    round_half_up_div(num, whole)
}
