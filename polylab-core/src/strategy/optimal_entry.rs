//! Optimal-entry miner and the profile-matching strategy.
//!
//! [`scan_optimal_entries`] walks a historical series, flags every bar from
//! which the price moves at least `min_gain` in the wanted direction within
//! `forward_window` bars, and condenses the feature vectors of those bars into
//! an [`EntryProfile`]. [`ProfileStrategy`] then fires on live bars whose
//! feature vector sits close to that profile.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{param_map, ParamMap, StepContext, Strategy};
use crate::domain::{BookSnapshot, Direction, MetaValue, PriceBar, Timestamp, TradeSignal};
use crate::indicators::{compute_features, mean, sample_std, FeatureParams, FEATURE_NAMES};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MinerError {
    #[error("entry direction must be buy or sell, got {0}")]
    InvalidDirection(Direction),

    #[error("no optimal {direction} entries found (min_gain={min_gain}, forward_window={forward_window}); try relaxing the thresholds")]
    NoQualifyingEntries {
        direction: Direction,
        min_gain: f64,
        forward_window: usize,
    },
}

// ── Profile ──────────────────────────────────────────────────────────

/// Statistical fingerprint of the bars that preceded a qualifying move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryProfile {
    pub direction: Direction,
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    /// Per-feature sample std; 0 for features with fewer than two samples.
    pub std: Vec<f64>,
    pub n_samples: usize,
    #[serde(default)]
    pub training_market: String,
}

impl EntryProfile {
    /// Standardized RMS distance of `features` from the profile mean.
    ///
    /// Only features that are present and have a nonzero profile std count.
    /// If none count, the profile degenerates to a point: the distance is 0.0
    /// when every present value equals its mean exactly, +∞ otherwise.
    pub fn distance(&self, features: &[Option<f64>]) -> f64 {
        struct Acc {
            sum_sq: f64,
            scored: usize,
            present: usize,
            on_point: bool,
        }

        let acc = features
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .filter_map(|(x, (&mu, &sigma))| x.map(|x| (x, mu, sigma)))
            .fold(
                Acc {
                    sum_sq: 0.0,
                    scored: 0,
                    present: 0,
                    on_point: true,
                },
                |mut acc, (x, mu, sigma)| {
                    acc.present += 1;
                    if sigma != 0.0 {
                        acc.sum_sq += ((x - mu) / sigma).powi(2);
                        acc.scored += 1;
                    } else if x != mu {
                        acc.on_point = false;
                    }
                    acc
                },
            );

        if acc.scored > 0 {
            (acc.sum_sq / acc.scored as f64).sqrt()
        } else if acc.present > 0 && acc.on_point {
            0.0
        } else {
            f64::INFINITY
        }
    }

    /// Human-readable feature table.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "EntryProfile: {} on '{}'",
                self.direction.as_str().to_uppercase(),
                self.training_market
            ),
            format!("Trained on {} optimal entry bars", self.n_samples),
            String::new(),
            format!("{:<18}  {:>8}  {:>8}", "Feature", "Mean", "Std"),
            "-".repeat(38),
        ];
        lines.extend(
            self.feature_names
                .iter()
                .zip(&self.mean)
                .zip(&self.std)
                .map(|((name, mu), sigma)| format!("{name:<18}  {mu:>8.4}  {sigma:>8.4}")),
        );
        lines.join("\n")
    }
}

// ── Miner ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum favourable move, in probability points.
    pub min_gain: f64,
    /// Bars ahead searched for the move.
    pub forward_window: usize,
    /// Bars skipped at the start; also the feature history length.
    pub indicator_window: usize,
    pub training_market: String,
    pub features: FeatureParams,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_gain: 0.04,
            forward_window: 24,
            indicator_window: 48,
            training_market: String::new(),
            features: FeatureParams::default(),
        }
    }
}

/// Mine `prices` for bars that preceded a move of at least `min_gain` in
/// `direction` and return their feature fingerprint.
///
/// Books are matched to bars by timestamp; a bar without a book is scored
/// against an empty one.
pub fn scan_optimal_entries(
    prices: &[PriceBar],
    books: &[BookSnapshot],
    direction: Direction,
    config: &ScanConfig,
) -> Result<EntryProfile, MinerError> {
    if direction == Direction::Hold {
        return Err(MinerError::InvalidDirection(direction));
    }

    let values: Vec<f64> = prices.iter().map(|b| b.price).collect();
    let book_by_ts: HashMap<Timestamp, &BookSnapshot> = books.iter().map(|b| (b.timestamp, b)).collect();
    let end = values.len().saturating_sub(config.forward_window);

    let mut rows = Vec::new();
    for i in config.indicator_window..end {
        let entry = values[i];
        let future = &values[i + 1..=i + config.forward_window];
        let triggered = match direction {
            Direction::Buy => future.iter().any(|&p| p >= entry + config.min_gain),
            _ => future.iter().any(|&p| p <= entry - config.min_gain),
        };
        if !triggered {
            continue;
        }

        let ts = prices[i].timestamp;
        let empty = BookSnapshot::empty(ts);
        let book = book_by_ts.get(&ts).copied().unwrap_or(&empty);
        let history = &values[i - config.indicator_window..=i];
        rows.push(compute_features(history, book, &config.features));
    }

    if rows.is_empty() {
        return Err(MinerError::NoQualifyingEntries {
            direction,
            min_gain: config.min_gain,
            forward_window: config.forward_window,
        });
    }

    let mut means = Vec::with_capacity(FEATURE_NAMES.len());
    let mut stds = Vec::with_capacity(FEATURE_NAMES.len());
    for col in 0..FEATURE_NAMES.len() {
        let column: Vec<f64> = rows.iter().filter_map(|row| row[col]).collect();
        means.push(mean(&column).unwrap_or(0.0));
        stds.push(sample_std(&column).unwrap_or(0.0));
    }

    debug!(
        direction = %direction,
        n_samples = rows.len(),
        training_market = %config.training_market,
        "entry profile mined"
    );

    Ok(EntryProfile {
        direction,
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        mean: means,
        std: stds,
        n_samples: rows.len(),
        training_market: config.training_market.clone(),
    })
}

// ── Strategy ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileStrategyParams {
    pub max_distance: f64,
    pub min_confidence: f64,
    /// Should match the parameters the profile was mined with.
    pub features: FeatureParams,
}

impl Default for ProfileStrategyParams {
    fn default() -> Self {
        Self {
            max_distance: 1.5,
            min_confidence: 0.35,
            features: FeatureParams::default(),
        }
    }
}

/// Fires in the profile's direction when the live feature vector is within
/// `max_distance` of the profile. Confidence is `1 / (1 + distance)`.
#[derive(Debug, Clone)]
pub struct ProfileStrategy {
    profile: EntryProfile,
    params: ProfileStrategyParams,
}

impl ProfileStrategy {
    pub fn new(profile: EntryProfile, params: ProfileStrategyParams) -> Self {
        Self { profile, params }
    }

    pub fn profile(&self) -> &EntryProfile {
        &self.profile
    }
}

impl Strategy for ProfileStrategy {
    fn name(&self) -> &str {
        "ProfileStrategy"
    }

    fn params(&self) -> ParamMap {
        let p = &self.params;
        let f = &p.features;
        let entries: [(&str, MetaValue); 13] = [
            ("training_market", self.profile.training_market.clone().into()),
            ("profile_direction", self.profile.direction.as_str().into()),
            ("n_samples", self.profile.n_samples.into()),
            ("max_distance", p.max_distance.into()),
            ("min_confidence", p.min_confidence.into()),
            ("rsi_period", f.rsi_period.into()),
            ("bb_period", f.bb_period.into()),
            ("macd_fast", f.macd_fast.into()),
            ("macd_slow", f.macd_slow.into()),
            ("macd_signal", f.macd_signal.into()),
            ("momentum_period", f.momentum_period.into()),
            ("vol_period", f.vol_period.into()),
            ("book_depth", f.book_depth.into()),
        ];
        param_map(entries)
    }

    fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<TradeSignal> {
        let features = compute_features(ctx.price_history, ctx.book, &self.params.features);
        let distance = self.profile.distance(&features);
        if distance > self.params.max_distance {
            return None;
        }
        let confidence = 1.0 / (1.0 + distance);
        if confidence < self.params.min_confidence {
            return None;
        }
        Some(
            TradeSignal::new(ctx.timestamp, self.profile.direction, ctx.price, confidence)
                .with_meta("distance", distance),
        )
    }
}
