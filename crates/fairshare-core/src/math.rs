//! Deterministic fixed-point arithmetic.
//!
//! All values are `u128`. Every operation truncates toward zero, which
//! under-distributes yield rather than over-distributing it. Overflow of an
//! intermediate product is an error, never a wrap.

use crate::constants::SCALE;
use crate::error::MathError;

/// Compute `a * b / c` with truncation.
///
/// # Errors
///
/// - [`MathError::DivisionByZero`] if `c == 0`
/// - [`MathError::ArithmeticOverflow`] if `a * b` does not fit in `u128`
///
/// # Examples
///
/// ```
/// use fairshare_core::math::mul_div;
/// assert_eq!(mul_div(7, 10, 4).unwrap(), 17);
/// ```
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    a.checked_mul(b)
        .map(|product| product / c)
        .ok_or(MathError::ArithmeticOverflow)
}

/// Checked addition mapped to [`MathError`].
pub fn checked_add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::ArithmeticOverflow)
}

/// Checked multiplication mapped to [`MathError`].
pub fn checked_mul(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_mul(b).ok_or(MathError::ArithmeticOverflow)
}

/// Checked division mapped to [`MathError`].
pub fn checked_div(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_div(b).ok_or(MathError::DivisionByZero)
}

/// Express `amount` as a fixed-point ratio of `unit`: `amount * scale / unit`.
///
/// A contribution of exactly `unit` yields `scale` (`1.0`); `k * unit`
/// yields `k * scale` with no rounding loss.
pub fn ratio_of(amount: u128, unit: u128, scale: u128) -> Result<u128, MathError> {
    mul_div(amount, scale, unit)
}

/// Render a fixed-point value with the default [`SCALE`] as a decimal string.
///
/// # Examples
///
/// ```
/// use fairshare_core::math::format_fixed;
/// assert_eq!(format_fixed(15_000_000), "1.5000000");
/// ```
pub fn format_fixed(value: u128) -> String {
    let digits = SCALE.ilog10() as usize;
    format!("{}.{:0digits$}", value / SCALE, value % SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mul_div_truncates() {
        assert_eq!(mul_div(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div(2, 1, 3).unwrap(), 0);
    }

    #[test]
    fn mul_div_division_by_zero() {
        assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn mul_div_overflow() {
        assert_eq!(mul_div(u128::MAX, 2, 2), Err(MathError::ArithmeticOverflow));
    }

    #[test]
    fn mul_div_large_but_fitting() {
        let a = u128::MAX / 4;
        assert_eq!(mul_div(a, 2, 2).unwrap(), a);
    }

    #[test]
    fn ratio_of_minimum_is_one() {
        assert_eq!(ratio_of(50, 50, SCALE).unwrap(), SCALE);
        assert_eq!(ratio_of(100, 50, SCALE).unwrap(), 2 * SCALE);
    }

    #[test]
    fn checked_helpers() {
        assert_eq!(checked_add(u128::MAX, 1), Err(MathError::ArithmeticOverflow));
        assert_eq!(checked_mul(u128::MAX, 2), Err(MathError::ArithmeticOverflow));
        assert_eq!(checked_div(1, 0), Err(MathError::DivisionByZero));
        assert_eq!(checked_div(9, 2).unwrap(), 4);
    }

    #[test]
    fn format_fixed_pads_fraction() {
        assert_eq!(format_fixed(SCALE), "1.0000000");
        assert_eq!(format_fixed(1), "0.0000001");
        assert_eq!(format_fixed(0), "0.0000000");
    }

    proptest! {
        #[test]
        fn integer_multiples_are_exact(k in 1u128..=250_000, min in 1u128..=1_000_000_000_000_000_000) {
            prop_assert_eq!(ratio_of(k * min, min, SCALE).unwrap(), k * SCALE);
        }

        #[test]
        fn mul_div_never_exceeds_exact(a in 0u128..=u64::MAX as u128, b in 0u128..=u64::MAX as u128, c in 1u128..=u64::MAX as u128) {
            let q = mul_div(a, b, c).unwrap();
            prop_assert!(q * c <= a * b);
            prop_assert!(a * b - q * c < c);
        }
    }
}
