//! Composite feature vector used by the optimal-entry miner and
//! `ProfileStrategy`.

use serde::{Deserialize, Serialize};

use super::{bollinger, book_imbalance, book_pressure, book_spread, macd, momentum, realized_vol, rsi};
use crate::domain::BookSnapshot;

/// Feature order of every vector produced by [`compute_features`].
pub const FEATURE_NAMES: [&str; 8] = [
    "rsi",
    "bb_z",
    "macd_hist",
    "momentum",
    "realized_vol",
    "book_imbalance",
    "book_pressure",
    "book_spread",
];

pub const N_FEATURES: usize = FEATURE_NAMES.len();

/// One value per entry of [`FEATURE_NAMES`]; `None` when history is short.
pub type FeatureVector = [Option<f64>; N_FEATURES];

/// Indicator periods used to build a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    pub rsi_period: usize,
    pub bb_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub momentum_period: usize,
    pub vol_period: usize,
    pub book_depth: usize,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            bb_period: 20,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            momentum_period: 10,
            vol_period: 24,
            book_depth: 5,
        }
    }
}

pub fn compute_features(prices: &[f64], book: &BookSnapshot, params: &FeatureParams) -> FeatureVector {
    [
        rsi(prices, params.rsi_period),
        bollinger(prices, params.bb_period, 2.0).map(|b| b.z),
        macd(prices, params.macd_fast, params.macd_slow, params.macd_signal).map(|m| m.histogram),
        momentum(prices, params.momentum_period),
        realized_vol(prices, params.vol_period),
        Some(book_imbalance(book)),
        Some(book_pressure(book, params.book_depth)),
        book_spread(book),
    ]
}
