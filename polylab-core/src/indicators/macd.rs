//! MACD: fast EMA − slow EMA, a signal line, and their histogram.
//!
//! Both EMAs are seeded at the first element of the supplied slice. The MACD
//! series starts at index `slow - 1`; the signal line is the EMA of that
//! series. Requires `slow + signal` prices.

use super::ema::{ema, ema_series};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdResult> {
    if slow == 0 || prices.len() < slow + signal {
        return None;
    }
    let fast_series = ema_series(prices, fast);
    let slow_series = ema_series(prices, slow);
    let macd_series: Vec<f64> = fast_series[slow - 1..]
        .iter()
        .zip(&slow_series[slow - 1..])
        .map(|(f, s)| f - s)
        .collect();
    if macd_series.len() < signal {
        return None;
    }
    let sig = ema(&macd_series, signal)?;
    let m = *macd_series.last()?;
    Some(MacdResult {
        macd: m,
        signal: sig,
        histogram: m - sig,
    })
}
