//! Checked 18-decimal fixed-point arithmetic
//!
//! All monetary and rate values are u128 scaled by 10^18. Signed
//! intermediates use i128. Every operation is checked: overflow and
//! underflow surface as errors instead of wrapping or saturating.
//!
//! # Critical Invariants
//!
//! 1. `MAX_RATE * MAX_SUPPLY` and `MAX_RATE * ONE` never exceed `i128::MAX`
//!    (asserted once, at compile time - this constrains configuration, not
//!    runtime values). The first bounds the supply-delta products, the
//!    second bounds the per-factor rate intermediates, so any reading the
//!    oracle clamps is safe for the whole delta computation.
//! 2. The only designed ceilings are the oracle clamps in the oracle module
//!    and the positive supply clamp in the policy engine; everything else
//!    that would wrap is an error
//!
//! # Example
//!
//! ```
//! use supply_policy_core::core::fixed::{self, ONE};
//!
//! // 1.5 units times 2 units = 3 units
//! let product = fixed::mul_div(3 * ONE / 2, 2 * ONE, ONE).unwrap();
//! assert_eq!(product, 3 * ONE);
//! ```

use thiserror::Error;

/// One whole unit in 18-decimal fixed point (10^18).
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// Signed counterpart of [`ONE`].
pub const ONE_SIGNED: i128 = ONE as i128;

/// Ceiling for market rates (exchange rate, reference index, target rate):
/// one hundred units. Derived for the 128-bit envelope: both
/// `MAX_RATE * MAX_SUPPLY` and the per-factor intermediate `MAX_RATE * ONE`
/// must stay representable as signed values.
pub const MAX_RATE: u128 = 100 * ONE;

/// Ceiling for the auxiliary-market delta rate (interpreted as a bounded
/// change of at most +/-100%).
pub const MAX_AUX_RATE: u128 = 2 * ONE;

/// Supply ceiling, derived so the envelope invariant below holds exactly.
pub const MAX_SUPPLY: u128 = (i128::MAX as u128) / MAX_RATE;

// Envelope invariants: the largest rate times the largest supply bounds the
// supply-delta products, and the largest rate times one unit bounds every
// per-factor rate intermediate. Both must stay representable as signed
// values.
const _: () = assert!(MAX_RATE * MAX_SUPPLY <= i128::MAX as u128);
const _: () = assert!(MAX_RATE * ONE <= i128::MAX as u128);

/// Errors from checked fixed-point operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FixedPointError {
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("arithmetic underflow")]
    ArithmeticUnderflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("value {0} too large for signed representation")]
    ValueTooLargeForSigned(u128),
}

/// Checked unsigned addition
pub fn add(a: u128, b: u128) -> Result<u128, FixedPointError> {
    a.checked_add(b).ok_or(FixedPointError::ArithmeticOverflow)
}

/// Checked unsigned subtraction
pub fn sub(a: u128, b: u128) -> Result<u128, FixedPointError> {
    a.checked_sub(b).ok_or(FixedPointError::ArithmeticUnderflow)
}

/// Checked `a * b / divisor` on unsigned values
///
/// The multiplication is performed first at full width, so the result is
/// exact up to the final truncating division.
pub fn mul_div(a: u128, b: u128, divisor: u128) -> Result<u128, FixedPointError> {
    if divisor == 0 {
        return Err(FixedPointError::DivisionByZero);
    }
    let product = a
        .checked_mul(b)
        .ok_or(FixedPointError::ArithmeticOverflow)?;
    Ok(product / divisor)
}

/// Checked signed addition
pub fn signed_add(a: i128, b: i128) -> Result<i128, FixedPointError> {
    a.checked_add(b).ok_or(FixedPointError::ArithmeticOverflow)
}

/// Checked signed subtraction
pub fn signed_sub(a: i128, b: i128) -> Result<i128, FixedPointError> {
    a.checked_sub(b).ok_or(FixedPointError::ArithmeticOverflow)
}

/// Checked `a * b / divisor` on signed values
///
/// Division truncates toward zero, matching integer semantics everywhere
/// else in the engine.
pub fn signed_mul_div(a: i128, b: i128, divisor: i128) -> Result<i128, FixedPointError> {
    if divisor == 0 {
        return Err(FixedPointError::DivisionByZero);
    }
    a.checked_mul(b)
        .ok_or(FixedPointError::ArithmeticOverflow)?
        .checked_div(divisor)
        .ok_or(FixedPointError::ArithmeticOverflow)
}

/// Convert an unsigned value to signed, failing if it does not fit
pub fn to_signed(value: u128) -> Result<i128, FixedPointError> {
    if value > i128::MAX as u128 {
        return Err(FixedPointError::ValueTooLargeForSigned(value));
    }
    Ok(value as i128)
}
