//! Property coverage for [`symbol_monetary_engine::price::approximate`]
//! (`spec.md` §4.B), the significant-figure rounding helper every ratio and
//! multiplier in the coin-generation formula passes through.

use proptest::prelude::*;
use symbol_monetary_engine::price::approximate;

proptest! {
    /// `approximate` is a projection: applying it twice never moves the
    /// value further than applying it once.
    #[test]
    fn approximate_is_idempotent(x in 0.0f64..1e12) {
        let once = approximate(x);
        let twice = approximate(once);
        prop_assert_eq!(once, twice);
    }

    /// Rounding never turns an input already representable within five
    /// decimal places into zero or a negative value. Inputs smaller than
    /// that (below `~5e-6`) are allowed to underflow to zero, since the
    /// function caps precision at five decimal places by design.
    #[test]
    fn approximate_preserves_positivity(x in 1e-4f64..1e12) {
        prop_assert!(approximate(x) > 0.0);
    }

    /// `approximate` only trims precision, it never changes magnitude: the
    /// rounded value always stays within a small relative distance of the
    /// input (the five-decimal-place floor dominates the error budget for
    /// small inputs, so the bound is generous rather than tight).
    #[test]
    fn approximate_stays_close_to_input(x in 1.0f64..1e10) {
        let rounded = approximate(x);
        let relative_error = ((rounded - x) / x).abs();
        prop_assert!(relative_error < 1e-4);
    }
}
