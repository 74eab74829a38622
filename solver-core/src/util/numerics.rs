//! Numerical tolerance contexts.
//!
//! Every comparison against zero in the solvers goes through a
//! [`NumberContext`] instead of exact equality.

/// Tolerance context for "is this number zero / small" decisions.
///
/// `epsilon` is a relative tolerance used when a reference magnitude is
/// available, `zero` an absolute floor below which anything counts as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberContext {
    /// Relative tolerance
    pub epsilon: f64,
    /// Absolute zero threshold
    pub zero: f64,
}

impl NumberContext {
    /// Create a context with the given relative and absolute tolerances.
    pub const fn new(epsilon: f64, zero: f64) -> Self {
        Self { epsilon, zero }
    }

    /// Context derived from a number of significant digits, e.g. 12 → 1e-12.
    pub fn of_precision(digits: i32) -> Self {
        let epsilon = 10f64.powi(-digits);
        Self { epsilon, zero: epsilon * epsilon.sqrt() }
    }

    /// Absolute zero test.
    #[inline]
    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() <= self.zero
    }

    /// Relative zero test: `value` is negligible compared to `reference`.
    ///
    /// Falls back to the absolute test when `reference` is itself zero.
    #[inline]
    pub fn is_small(&self, reference: f64, value: f64) -> bool {
        let scale = reference.abs();
        if scale <= self.zero {
            self.is_zero(value)
        } else {
            value.abs() <= self.epsilon * scale
        }
    }

    /// `a` and `b` are equal within the relative tolerance of the larger one.
    #[inline]
    pub fn is_difference_zero(&self, a: f64, b: f64) -> bool {
        let diff = (a - b).abs();
        diff <= self.zero || diff <= self.epsilon * a.abs().max(b.abs())
    }

    /// Threshold used for "strictly positive/negative beyond tolerance"
    /// decisions at the given magnitude.
    #[inline]
    pub fn threshold(&self, reference: f64) -> f64 {
        (self.epsilon * reference.abs()).max(self.zero)
    }
}

impl Default for NumberContext {
    fn default() -> Self {
        Self::of_precision(12)
    }
}

/// Sign of `value`, treating zero (of either sign) as positive.
#[inline]
pub fn signum_or_one(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Largest absolute entry of a slice (0 for an empty slice).
pub fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_zero_absolute() {
        let ctx = NumberContext::new(1e-10, 1e-14);
        assert!(ctx.is_zero(0.0));
        assert!(ctx.is_zero(-1e-15));
        assert!(!ctx.is_zero(1e-12));
    }

    #[test]
    fn test_is_small_relative() {
        let ctx = NumberContext::new(1e-8, 1e-14);
        assert!(ctx.is_small(1e6, 1e-3));
        assert!(!ctx.is_small(1.0, 1e-3));
        // Zero reference falls back to absolute test
        assert!(ctx.is_small(0.0, 1e-16));
        assert!(!ctx.is_small(0.0, 1e-6));
    }

    #[test]
    fn test_difference_zero() {
        let ctx = NumberContext::of_precision(8);
        assert!(ctx.is_difference_zero(1.0, 1.0 + 1e-10));
        assert!(!ctx.is_difference_zero(1.0, 1.001));
    }

    #[test]
    fn test_signum_or_one() {
        assert_eq!(signum_or_one(0.0), 1.0);
        assert_eq!(signum_or_one(-0.0), 1.0);
        assert_eq!(signum_or_one(-3.0), -1.0);
        assert_eq!(max_abs(&[1.0, -4.0, 2.0]), 4.0);
        assert_eq!(max_abs(&[]), 0.0);
    }
}
