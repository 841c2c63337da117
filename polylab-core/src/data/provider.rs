//! Data provider trait, request/payload types, and structured errors.
//!
//! The `MarketDataProvider` trait abstracts the upstream market-data API so
//! the runner can be driven by the HTTP provider in production and by an
//! in-memory fake in tests. The cache layer sits above this trait; providers
//! don't know about the cache.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::Timestamp;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no price data for token '{token_label}' in market '{market_id}' (available: {available:?})")]
    DataUnavailable {
        market_id: String,
        token_label: String,
        available: Vec<String>,
    },

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    UpstreamRateLimited { retry_after_secs: u64 },

    #[error("upstream error: HTTP {status}: {detail}")]
    UpstreamError { status: u16, detail: String },

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("cache error: {0}")]
    Cache(String),
}

impl DataError {
    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::UpstreamRateLimited { .. } | DataError::Network(_)
        )
    }
}

/// A request bound: numeric epoch seconds or an ISO-8601 string, passed to
/// the provider as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBound {
    Epoch(Timestamp),
    Iso(String),
}

impl TimeBound {
    /// The bound truncated to minute granularity, as used in cache keys.
    ///
    /// Numeric bounds floor to a multiple of 60; ISO strings keep their first
    /// 16 characters (`YYYY-MM-DDTHH:MM`).
    pub fn minute_bucket(&self) -> String {
        match self {
            TimeBound::Epoch(ts) => (ts.div_euclid(60) * 60).to_string(),
            TimeBound::Iso(s) => s.chars().take(16).collect(),
        }
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBound::Epoch(ts) => write!(f, "{ts}"),
            TimeBound::Iso(s) => f.write_str(s),
        }
    }
}

impl From<Timestamp> for TimeBound {
    fn from(ts: Timestamp) -> Self {
        TimeBound::Epoch(ts)
    }
}

impl From<&str> for TimeBound {
    fn from(s: &str) -> Self {
        TimeBound::Iso(s.to_string())
    }
}

impl From<String> for TimeBound {
    fn from(s: String) -> Self {
        TimeBound::Iso(s)
    }
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(dt: DateTime<Utc>) -> Self {
        TimeBound::Iso(dt.to_rfc3339())
    }
}

/// One fetch window for one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub market_id: String,
    pub start: TimeBound,
    pub end: TimeBound,
    /// Bar interval, e.g. "1m", "10m", "1h", "6h", "1d".
    pub resolution: String,
}

impl FetchRequest {
    pub fn new(
        market_id: impl Into<String>,
        start: impl Into<TimeBound>,
        end: impl Into<TimeBound>,
        resolution: impl Into<String>,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            start: start.into(),
            end: end.into(),
            resolution: resolution.into(),
        }
    }
}

/// Raw points keyed by token label (e.g. "YES", "NO").
pub type LabelledPoints = BTreeMap<String, Vec<Value>>;

/// Raw prices and books for one market window; the unit the cache stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPayload {
    #[serde(default)]
    pub prices: LabelledPoints,
    #[serde(default)]
    pub books: LabelledPoints,
}

impl MarketPayload {
    /// Token labels that have a non-empty price series.
    pub fn price_labels(&self) -> Vec<String> {
        self.prices
            .iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(label, _)| label.clone())
            .collect()
    }
}

/// Market-level metrics at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: Timestamp,
    pub spread: Option<f64>,
    pub liquidity: Option<f64>,
    pub volume: Option<f64>,
}

/// Upstream market-data source.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Price points per token label: `{label: [{t|ts, p|price}, ...]}`.
    fn prices(&self, request: &FetchRequest) -> Result<LabelledPoints, DataError>;

    /// Book snapshots per token label: `{label: [{t|ts, bids, asks}, ...]}`.
    fn books(&self, request: &FetchRequest) -> Result<LabelledPoints, DataError>;

    /// Market-level metric points: `[{ts, spread, liquidity, volume}, ...]`.
    fn metrics(&self, request: &FetchRequest) -> Result<Vec<Value>, DataError>;
}
