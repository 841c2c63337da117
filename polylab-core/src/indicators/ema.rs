//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = k * x[t] + (1 - k) * EMA[t-1], k = 2 / (period + 1).
//! Seed: EMA[0] = x[0] (no SMA warm-up).

/// Smoothing factor for a given period.
pub fn ema_alpha(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Final EMA value over the whole slice, seeded at its first element.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    let k = ema_alpha(period);
    Some(rest.iter().fold(first, |acc, &v| v * k + acc * (1.0 - k)))
}

/// Running EMA: element `i` is the EMA of `values[..=i]`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let k = ema_alpha(period);
    let mut out = Vec::with_capacity(values.len());
    let mut acc = None;
    for &v in values {
        let next = match acc {
            None => v,
            Some(prev) => v * k + prev * (1.0 - k),
        };
        acc = Some(next);
        out.push(next);
    }
    out
}
