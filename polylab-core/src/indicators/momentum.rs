//! Momentum as rate of change: (p[-1] − p[-period-1]) / p[-period-1].
//! Lookback: period + 1 prices. A zero base yields `None`.

pub fn momentum(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period + 1 {
        return None;
    }
    let base = prices[prices.len() - period - 1];
    if base == 0.0 {
        return None;
    }
    let last = *prices.last()?;
    Some((last - base) / base)
}
