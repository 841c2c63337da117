//! Trend slope: net price change over the last `lookback` bars,
//! p[-1] − p[-lookback-1]. Used by trend filters.

pub fn trend_slope(prices: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || prices.len() < lookback + 1 {
        return None;
    }
    let last = *prices.last()?;
    Some(last - prices[prices.len() - lookback - 1])
}
