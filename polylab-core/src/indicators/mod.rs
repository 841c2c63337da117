//! Indicator library.
//!
//! Pure, stateless functions over a trailing price slice (oldest first) or a
//! single order book snapshot. Price indicators return `None` when the slice is
//! shorter than their required minimum; book indicators fall back to a neutral
//! value when a side is empty.

pub mod bollinger;
pub mod book;
pub mod ema;
pub mod features;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod trend;
pub mod volatility;

pub use bollinger::{bollinger, BollingerBands};
pub use book::{book_imbalance, book_pressure, book_spread};
pub use ema::ema;
pub use features::{compute_features, FeatureParams, FeatureVector, FEATURE_NAMES};
pub use macd::{macd, MacdResult};
pub use momentum::momentum;
pub use rsi::rsi;
pub use trend::trend_slope;
pub use volatility::realized_vol;

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator); `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Linear ramp of `n` prices from `start` in steps of `step`.
#[cfg(test)]
pub fn ramp(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}
