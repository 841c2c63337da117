//! Relative Strength Index (RSI).
//!
//! Simple averages (not Wilder smoothing) of the gains and losses over the
//! last `period` price deltas, each divided by `period`.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period + 1 prices.
//! Edge case: avg_loss == 0 → RSI = 100 (including a flat window).

/// RSI in [0, 100] of the final price, or `None` if `prices.len() < period + 1`.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }
    let tail = &prices[prices.len() - period - 1..];
    let (mut gains, mut losses) = (0.0, 0.0);
    for w in tail.windows(2) {
        let delta = w[1] - w[0];
        if delta > 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}
