//! Strategy interface and built-in strategies.
//!
//! A strategy sees one bar at a time through a [`StepContext`] and may emit a
//! [`TradeSignal`]. The engine only consults the strategy while flat and once
//! the history window is full, so any internal state a strategy keeps (rolling
//! statistics, previous histogram, previous zone) only advances on those bars.

pub mod longshot_bias;
pub mod macd_momentum;
pub mod optimal_entry;
pub mod rsi_mean_reversion;
pub mod whale_watcher;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{BookSnapshot, MetaValue, Timestamp, TradeSignal};

pub use longshot_bias::{LongshotBias, LongshotBiasParams};
pub use macd_momentum::{MacdMomentum, MacdMomentumParams};
pub use optimal_entry::{
    scan_optimal_entries, EntryProfile, MinerError, ProfileStrategy, ProfileStrategyParams,
    ScanConfig,
};
pub use rsi_mean_reversion::{RsiMeanReversion, RsiMeanReversionParams};
pub use whale_watcher::{WhaleWatcher, WhaleWatcherParams};

/// Strategy parameter value, as reported by [`Strategy::params`].
pub type ParamValue = MetaValue;

/// Parameter listing attached to every backtest result.
pub type ParamMap = BTreeMap<String, ParamValue>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrategyError {
    #[error("invalid strategy configuration: {0}")]
    InvalidStrategyConfiguration(String),
}

/// Everything a strategy may look at for one bar.
///
/// Histories are oldest-first and include the current bar as their last
/// element.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub timestamp: Timestamp,
    pub price: f64,
    pub book: &'a BookSnapshot,
    pub price_history: &'a [f64],
    pub book_history: &'a [BookSnapshot],
}

/// A pluggable signal generator driven bar by bar by the replay engine.
pub trait Strategy: Send {
    /// Stable display name (e.g. "RSIMeanReversion").
    fn name(&self) -> &str;

    /// Configuration snapshot recorded on the result.
    fn params(&self) -> ParamMap;

    /// Inspect one bar. `None` (or a Hold signal) means no entry.
    fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<TradeSignal>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn params(&self) -> ParamMap {
        (**self).params()
    }

    fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<TradeSignal> {
        (**self).on_step(ctx)
    }
}

/// Shared min/max price band check used by several strategies.
pub(crate) fn outside_band(price: f64, min_price: f64, max_price: f64) -> bool {
    price < min_price || price > max_price
}

/// Build a `ParamMap` from `(name, value)` pairs.
pub(crate) fn param_map<const N: usize>(entries: [(&str, ParamValue); N]) -> ParamMap {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
