//! Property tests for the statistics module.

use polylab_runner::stats::{bootstrap_mean_ci, wilson_ci, BootstrapConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn wilson_bounds_are_ordered_and_cover_the_rate(n in 0usize..500, frac in 0.0f64..=1.0) {
        let wins = ((n as f64) * frac).round() as usize;
        let ci = wilson_ci(wins, n);
        prop_assert!(ci.lower >= 0.0);
        prop_assert!(ci.upper <= 1.0);
        prop_assert!(ci.lower <= ci.upper);
        prop_assert_eq!(ci.n, n);
        if n > 0 {
            let rate = wins as f64 / n as f64;
            prop_assert!(ci.lower <= rate + 1e-12 && rate <= ci.upper + 1e-12);
        } else {
            prop_assert_eq!((ci.lower, ci.upper), (0.0, 1.0));
        }
    }

    #[test]
    fn wilson_narrows_with_more_trades(wins in 1usize..50) {
        let small = wilson_ci(wins, wins * 2);
        let large = wilson_ci(wins * 4, wins * 8);
        prop_assert!(large.width() < small.width());
    }

    #[test]
    fn bootstrap_is_seeded_and_bounded(values in prop::collection::vec(-0.5f64..0.5, 1..40)) {
        let config = BootstrapConfig { n_resamples: 200, ..BootstrapConfig::default() };
        let a = bootstrap_mean_ci(&values, &config).unwrap();
        let b = bootstrap_mean_ci(&values, &config).unwrap();
        prop_assert_eq!(a, b);

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(a.lower <= a.upper);
        prop_assert!(a.lower >= min - 1e-12 && a.upper <= max + 1e-12);
    }
}
