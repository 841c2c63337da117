//! Bollinger Bands plus the z-score of the last price.
//!
//! Middle: mean of the last `period` prices.
//! Upper/Lower: middle ± n_std × sample std (n − 1).
//! Edge case: zero std → all bands collapse to the middle and z = 0. A std
//! within rounding noise of the mean (constant windows) counts as zero.

use super::{mean, sample_std};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
    /// (last price − mid) / std
    pub z: f64,
}

pub fn bollinger(prices: &[f64], period: usize, n_std: f64) -> Option<BollingerBands> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    let mid = mean(window)?;
    let std = sample_std(window).unwrap_or(0.0);
    let flat = window.iter().all(|&p| p == window[0]);
    if flat || std <= f64::EPSILON * mid.abs().max(1.0) {
        return Some(BollingerBands {
            upper: mid,
            mid,
            lower: mid,
            z: 0.0,
        });
    }
    let last = *window.last()?;
    Some(BollingerBands {
        upper: mid + n_std * std,
        mid,
        lower: mid - n_std * std,
        z: (last - mid) / std,
    })
}
