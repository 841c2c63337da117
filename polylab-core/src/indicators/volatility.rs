//! Realized volatility: sample std of log returns over the last `period` bars.
//!
//! Uses the trailing `period + 1` prices. Returns with a non-positive price on
//! either side are skipped. Needs at least two valid returns.

use super::sample_std;

pub fn realized_vol(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period + 1 {
        return None;
    }
    let window = &prices[prices.len() - period - 1..];
    let log_returns: Vec<f64> = window
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect();
    sample_std(&log_returns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn flat_prices_have_zero_vol() {
        assert_approx(realized_vol(&[0.5; 30], 24).unwrap(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_prices_are_skipped() {
        // every pair touches a zero price → no valid returns
        assert_eq!(realized_vol(&[0.0, 0.5, 0.0, 0.6], 3), None);
    }

    #[test]
    fn known_vol() {
        // log returns ln2, −ln2 → mean 0, sample var 2·ln2² → std √2·ln2
        let v = realized_vol(&[1.0, 2.0, 1.0], 2).unwrap();
        assert_approx(v, 2.0_f64.sqrt() * 2.0_f64.ln(), 1e-12);
    }

    #[test]
    fn insufficient_history() {
        assert_eq!(realized_vol(&[0.5; 24], 24), None);
    }
}
