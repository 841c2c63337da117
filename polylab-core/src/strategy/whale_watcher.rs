//! Whale watcher: follow large resting orders placed against the trend.
//!
//! Each bar records the largest single-level notional on each side of the
//! book. A level whose notional z-score (against the prior rolling window)
//! reaches `whale_z_threshold` is a whale. A bid whale during a falling market
//! is followed with a BUY; an ask whale during a rising market with a SELL.
//! With `imbalance_confirm`, the change in notional book imbalance since the
//! previous evaluated bar must also point toward the whale's side.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{param_map, ParamMap, StepContext, Strategy};
use crate::domain::{BookLevel, Direction, TradeSignal};
use crate::indicators::{book_imbalance, mean, sample_std, trend_slope};

/// Fewest notional samples needed before z-scores are trusted.
const MIN_WARMUP_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhaleWatcherParams {
    pub whale_z_threshold: f64,
    pub trend_lookback: usize,
    pub min_trend_move: f64,
    pub min_whale_notional: f64,
    pub stat_window: usize,
    pub imbalance_confirm: bool,
}

impl Default for WhaleWatcherParams {
    fn default() -> Self {
        Self {
            whale_z_threshold: 3.0,
            trend_lookback: 24,
            min_trend_move: 0.02,
            min_whale_notional: 500.0,
            stat_window: 48,
            imbalance_confirm: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WhaleWatcher {
    params: WhaleWatcherParams,
    bid_notionals: VecDeque<f64>,
    ask_notionals: VecDeque<f64>,
    prev_imbalance: Option<f64>,
}

impl WhaleWatcher {
    pub fn new(params: WhaleWatcherParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    fn warmup(&self) -> usize {
        (self.params.stat_window / 2).max(MIN_WARMUP_SAMPLES)
    }
}

/// Largest price × size across all levels of one side.
fn largest_level_notional(levels: &[BookLevel]) -> f64 {
    levels
        .iter()
        .map(BookLevel::notional)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

/// Z-score of the newest sample against the samples before it.
fn trailing_z(samples: &mut VecDeque<f64>) -> f64 {
    let values = samples.make_contiguous();
    let Some((&current, prior)) = values.split_last() else {
        return 0.0;
    };
    let mu = mean(prior).unwrap_or(0.0);
    let sigma = sample_std(prior).unwrap_or(0.0);
    if sigma > 0.0 {
        (current - mu) / sigma
    } else {
        0.0
    }
}

impl Strategy for WhaleWatcher {
    fn name(&self) -> &str {
        "WhaleWatcher"
    }

    fn params(&self) -> ParamMap {
        let p = &self.params;
        param_map([
            ("whale_z_threshold", p.whale_z_threshold.into()),
            ("trend_lookback", p.trend_lookback.into()),
            ("min_trend_move", p.min_trend_move.into()),
            ("min_whale_notional", p.min_whale_notional.into()),
            ("stat_window", p.stat_window.into()),
            ("imbalance_confirm", p.imbalance_confirm.into()),
        ])
    }

    fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<TradeSignal> {
        let p = self.params;
        let bid_notional = largest_level_notional(&ctx.book.bids);
        let ask_notional = largest_level_notional(&ctx.book.asks);

        self.bid_notionals.push_back(bid_notional);
        self.ask_notionals.push_back(ask_notional);
        if self.bid_notionals.len() > p.stat_window {
            self.bid_notionals.pop_front();
            self.ask_notionals.pop_front();
        }
        if self.bid_notionals.len() < self.warmup() {
            return None;
        }

        let trend_move = trend_slope(ctx.price_history, p.trend_lookback)?;
        if trend_move.abs() < p.min_trend_move {
            return None;
        }
        let trend_up = trend_move > 0.0;

        let bid_z = trailing_z(&mut self.bid_notionals);
        let ask_z = trailing_z(&mut self.ask_notionals);
        let whale_on_bid = bid_z >= p.whale_z_threshold && bid_notional >= p.min_whale_notional;
        let whale_on_ask = ask_z >= p.whale_z_threshold && ask_notional >= p.min_whale_notional;

        let imbalance = book_imbalance(ctx.book);
        let imbalance_delta = self.prev_imbalance.map_or(0.0, |prev| imbalance - prev);
        self.prev_imbalance = Some(imbalance);

        if whale_on_bid && !trend_up && !(p.imbalance_confirm && imbalance_delta <= 0.0) {
            let confidence = (bid_z / (p.whale_z_threshold * 2.0)).min(1.0);
            return Some(
                TradeSignal::new(ctx.timestamp, Direction::Buy, ctx.price, confidence)
                    .with_meta("bid_z", bid_z)
                    .with_meta("bid_notional", bid_notional)
                    .with_meta("trend_move", trend_move)
                    .with_meta("imbalance", imbalance)
                    .with_meta("imbalance_delta", imbalance_delta),
            );
        }

        if whale_on_ask && trend_up && !(p.imbalance_confirm && imbalance_delta >= 0.0) {
            let confidence = (ask_z / (p.whale_z_threshold * 2.0)).min(1.0);
            return Some(
                TradeSignal::new(ctx.timestamp, Direction::Sell, ctx.price, confidence)
                    .with_meta("ask_z", ask_z)
                    .with_meta("ask_notional", ask_notional)
                    .with_meta("trend_move", trend_move)
                    .with_meta("imbalance", imbalance)
                    .with_meta("imbalance_delta", imbalance_delta),
            );
        }

        None
    }
}
