//! Statistical checks for backtest results.
//!
//! - Wilson score interval for win rates
//! - Sample size needed to trust an observed edge
//! - Pairwise price correlation and effective sample size
//! - Seeded bootstrap interval for mean per-trade P&L

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::metrics::mean_f64;
use crate::result::BacktestResult;

/// z for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

// ─── Wilson interval ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub n: usize,
}

impl ConfidenceInterval {
    pub fn contains(&self, rate: f64) -> bool {
        self.lower <= rate && rate <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.1}%, {:.1}%]  n={}",
            self.lower * 100.0,
            self.upper * 100.0,
            self.n
        )
    }
}

/// 95% Wilson score interval for `wins` out of `n`. `n == 0` gives `[0, 1]`.
pub fn wilson_ci(wins: usize, n: usize) -> ConfidenceInterval {
    wilson_ci_z(wins, n, Z_95)
}

/// Wilson score interval at an arbitrary z. Bounds are clamped to [0, 1].
pub fn wilson_ci_z(wins: usize, n: usize, z: f64) -> ConfidenceInterval {
    if n == 0 {
        return ConfidenceInterval {
            lower: 0.0,
            upper: 1.0,
            n: 0,
        };
    }
    let nf = n as f64;
    let p = wins.min(n) as f64 / nf;
    let z2 = z * z;
    let denom = 1.0 + z2 / nf;
    let centre = (p + z2 / (2.0 * nf)) / denom;
    let margin = z * (p * (1.0 - p) / nf + z2 / (4.0 * nf * nf)).sqrt() / denom;
    ConfidenceInterval {
        lower: (centre - margin).max(0.0),
        upper: (centre + margin).min(1.0),
        n,
    }
}

// ─── Sample size ─────────────────────────────────────────────────────

/// Trades needed to tell `observed_win_rate` from `null_win_rate`
/// (two-proportion z-test approximation), rounded up.
///
/// Only the conventional levels are tabulated: alpha 0.05 (else 0.01) and
/// power 0.80 (else 0.90). `None` when the two rates are equal.
pub fn min_trades_for_significance(
    observed_win_rate: f64,
    null_win_rate: f64,
    alpha: f64,
    power: f64,
) -> Option<usize> {
    let z_alpha = if alpha == 0.05 { 1.96 } else { 2.576 };
    let z_beta = if power == 0.80 { 0.842 } else { 1.282 };
    let (p0, p1) = (null_win_rate, observed_win_rate);
    let denom = (p1 - p0).powi(2);
    if denom == 0.0 {
        return None;
    }
    let p_bar = (p0 + p1) / 2.0;
    let num = (z_alpha * (2.0 * p_bar * (1.0 - p_bar)).sqrt()
        + z_beta * (p0 * (1.0 - p0) + p1 * (1.0 - p1)).sqrt())
    .powi(2);
    Some((num / denom).ceil() as usize)
}

/// Whether `result` beats `null_win_rate` with enough trades to trust it
/// (alpha 0.05, power 0.80).
pub fn is_significant(result: &BacktestResult, null_win_rate: f64) -> bool {
    let observed = result.win_rate();
    if observed <= null_win_rate {
        return false;
    }
    min_trades_for_significance(observed, null_win_rate, 0.05, 0.80)
        .is_some_and(|needed| result.n_trades() >= needed)
}

// ─── Correlation ─────────────────────────────────────────────────────

/// Pearson correlation over the common prefix of `a` and `b`.
/// `None` with fewer than 3 points or when either side has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 3 {
        return None;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let ma = mean_f64(a);
    let mb = mean_f64(b);
    let (mut cov, mut va, mut vb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va == 0.0 || vb == 0.0 {
        return None;
    }
    Some(cov / (va * vb).sqrt())
}

/// Pairwise correlations over label-sorted pairs `(a, b)` with `a < b`.
pub fn price_correlation_matrix(
    series: &BTreeMap<String, Vec<f64>>,
) -> BTreeMap<(String, String), Option<f64>> {
    let labels: Vec<&String> = series.keys().collect();
    let mut out = BTreeMap::new();
    for (i, a) in labels.iter().enumerate() {
        for b in &labels[i + 1..] {
            out.insert(
                ((*a).clone(), (*b).clone()),
                pearson(&series[*a], &series[*b]),
            );
        }
    }
    out
}

/// Rough effective number of independent series behind a set of pairwise
/// correlations: `n / (1 + (n − 1)·mean|ρ|)`, with `n` solved from the pair
/// count. NaN when no correlation is present.
pub fn effective_sample_size(correlations: &[Option<f64>]) -> f64 {
    let rhos: Vec<f64> = correlations.iter().flatten().map(|r| r.abs()).collect();
    if rhos.is_empty() {
        return f64::NAN;
    }
    let n = (1.0 + (1.0 + 8.0 * rhos.len() as f64).sqrt()) / 2.0;
    let mean_rho = mean_f64(&rhos);
    n / (1.0 + (n - 1.0) * mean_rho)
}

// ─── Bootstrap ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub n_resamples: usize,
    /// Two-sided coverage, e.g. 0.95.
    pub confidence: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_resamples: 1000,
            confidence: 0.95,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub n_resamples: usize,
}

/// Percentile bootstrap interval for the mean of `values`, resampling i.i.d.
/// with replacement. `None` for an empty sample or zero resamples.
pub fn bootstrap_mean_ci(values: &[f64], config: &BootstrapConfig) -> Option<BootstrapInterval> {
    if values.is_empty() || config.n_resamples == 0 {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let n = values.len();
    let mut means: Vec<f64> = (0..config.n_resamples)
        .map(|_| (0..n).map(|_| values[rng.gen_range(0..n)]).sum::<f64>() / n as f64)
        .collect();
    means.sort_by(|a, b| a.total_cmp(b));

    let tail = ((1.0 - config.confidence.clamp(0.0, 1.0)) / 2.0).max(0.0);
    let last = means.len() - 1;
    let lo_idx = ((tail * last as f64).floor() as usize).min(last);
    let hi_idx = (((1.0 - tail) * last as f64).ceil() as usize).min(last);
    Some(BootstrapInterval {
        mean: mean_f64(values),
        lower: means[lo_idx],
        upper: means[hi_idx],
        n_resamples: config.n_resamples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64, eps: f64) {
        assert!(
            (actual - expected).abs() < eps,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn wilson_empty_is_unit_interval() {
        let ci = wilson_ci(0, 0);
        assert_eq!((ci.lower, ci.upper, ci.n), (0.0, 1.0, 0));
    }

    #[test]
    fn wilson_known_value() {
        // 8 wins of 10 at z = 1.96
        let ci = wilson_ci(8, 10);
        assert_approx(ci.lower, 0.4902, 1e-3);
        assert_approx(ci.upper, 0.9433, 1e-3);
        assert!(ci.contains(0.8));
    }

    #[test]
    fn wilson_extremes_stay_in_bounds() {
        let all = wilson_ci(20, 20);
        assert!(all.upper <= 1.0 && all.lower > 0.5);
        let none = wilson_ci(0, 20);
        assert!(none.lower.abs() < 1e-12);
        assert!(none.upper < 0.5);
    }

    #[test]
    fn wilson_display() {
        let ci = ConfidenceInterval {
            lower: 0.25,
            upper: 0.5,
            n: 12,
        };
        assert_eq!(ci.to_string(), "[25.0%, 50.0%]  n=12");
    }

    #[test]
    fn sample_size_default_levels() {
        // 0.75 vs 0.50 at alpha 0.05, power 0.80
        assert_eq!(min_trades_for_significance(0.75, 0.50, 0.05, 0.80), Some(58));
    }

    #[test]
    fn sample_size_grows_for_stricter_levels() {
        let base = min_trades_for_significance(0.60, 0.50, 0.05, 0.80).unwrap();
        let strict = min_trades_for_significance(0.60, 0.50, 0.01, 0.90).unwrap();
        assert!(strict > base);
    }

    #[test]
    fn sample_size_undefined_without_edge() {
        assert_eq!(min_trades_for_significance(0.5, 0.5, 0.05, 0.80), None);
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert_approx(pearson(&a, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0, 1e-12);
        assert_approx(pearson(&a, &[4.0, 3.0, 2.0, 1.0]).unwrap(), -1.0, 1e-12);
    }

    #[test]
    fn pearson_degenerate_cases() {
        assert_eq!(pearson(&[1.0, 2.0], &[1.0, 2.0]), None);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn pearson_truncates_to_common_length() {
        let r = pearson(&[1.0, 2.0, 3.0, 100.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_approx(r, 1.0, 1e-12);
    }

    #[test]
    fn matrix_uses_sorted_pairs() {
        let mut series = BTreeMap::new();
        series.insert("b".to_string(), vec![1.0, 2.0, 3.0]);
        series.insert("a".to_string(), vec![3.0, 2.0, 1.0]);
        series.insert("c".to_string(), vec![1.0, 1.0, 1.0]);
        let m = price_correlation_matrix(&series);
        assert_eq!(m.len(), 3);
        assert_approx(m[&("a".to_string(), "b".to_string())].unwrap(), -1.0, 1e-12);
        assert_eq!(m[&("a".to_string(), "c".to_string())], None);
        assert_eq!(m[&("b".to_string(), "c".to_string())], None);
    }

    #[test]
    fn effective_n_bounds() {
        // three series, uncorrelated → 3
        assert_approx(effective_sample_size(&[Some(0.0), Some(0.0), Some(0.0)]), 3.0, 1e-12);
        // three series, perfectly correlated → 1
        assert_approx(effective_sample_size(&[Some(1.0), Some(-1.0), Some(1.0)]), 1.0, 1e-12);
        assert!(effective_sample_size(&[None, None]).is_nan());
    }

    #[test]
    fn bootstrap_is_deterministic_and_brackets_mean() {
        let pnls = [0.05, -0.02, 0.08, 0.01, -0.04, 0.03, 0.06, -0.01];
        let config = BootstrapConfig::default();
        let a = bootstrap_mean_ci(&pnls, &config).unwrap();
        let b = bootstrap_mean_ci(&pnls, &config).unwrap();
        assert_eq!(a, b);
        assert!(a.lower <= a.mean && a.mean <= a.upper);
        assert!(a.lower >= -0.04 && a.upper <= 0.08);
    }

    #[test]
    fn bootstrap_constant_sample_collapses() {
        let ci = bootstrap_mean_ci(&[0.02; 5], &BootstrapConfig::default()).unwrap();
        assert_approx(ci.lower, 0.02, 1e-12);
        assert_approx(ci.upper, 0.02, 1e-12);
        assert!(bootstrap_mean_ci(&[], &BootstrapConfig::default()).is_none());
    }
}
