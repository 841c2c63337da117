//! Backtest result and derived statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use polylab_core::domain::{ExitReason, Trade};
use polylab_core::strategy::ParamMap;

use crate::metrics;
use crate::stats::{wilson_ci, ConfidenceInterval};

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
///
/// Only the trades are stored; every statistic is derived from them on
/// demand, so `n_trades() == trades.len()` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub market_id: String,
    pub token_label: String,
    pub resolution: String,
    pub strategy_name: String,
    pub strategy_params: ParamMap,
    pub trades: Vec<Trade>,
    /// Bars replayed (diagnostic).
    #[serde(default)]
    pub bars_processed: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Flat snapshot of the derived statistics, for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultStats {
    pub n_trades: usize,
    pub win_rate: f64,
    pub win_rate_ci: ConfidenceInterval,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
}

impl BacktestResult {
    pub fn new(
        market_id: impl Into<String>,
        token_label: impl Into<String>,
        resolution: impl Into<String>,
        strategy_name: impl Into<String>,
        strategy_params: ParamMap,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            market_id: market_id.into(),
            token_label: token_label.into(),
            resolution: resolution.into(),
            strategy_name: strategy_name.into(),
            strategy_params,
            trades: Vec::new(),
            bars_processed: 0,
        }
    }

    pub fn n_trades(&self) -> usize {
        self.trades.len()
    }

    pub fn wins(&self) -> usize {
        metrics::win_count(&self.trades)
    }

    pub fn win_rate(&self) -> f64 {
        metrics::win_rate(&self.trades)
    }

    /// Wilson 95% interval for the win rate.
    pub fn win_rate_ci(&self) -> ConfidenceInterval {
        wilson_ci(self.wins(), self.n_trades())
    }

    pub fn total_pnl(&self) -> f64 {
        metrics::total_pnl(&self.trades)
    }

    pub fn avg_pnl(&self) -> f64 {
        metrics::avg_pnl(&self.trades)
    }

    pub fn max_drawdown(&self) -> f64 {
        metrics::max_drawdown(&self.trades)
    }

    pub fn sharpe_ratio(&self) -> f64 {
        metrics::sharpe_ratio(&self.trades)
    }

    pub fn exit_reason_breakdown(&self) -> BTreeMap<ExitReason, usize> {
        metrics::exit_reason_breakdown(&self.trades)
    }

    /// Net P&L per trade, in exit order.
    pub fn pnls(&self) -> Vec<f64> {
        self.trades.iter().map(Trade::pnl).collect()
    }

    pub fn stats(&self) -> ResultStats {
        ResultStats {
            n_trades: self.n_trades(),
            win_rate: self.win_rate(),
            win_rate_ci: self.win_rate_ci(),
            total_pnl: self.total_pnl(),
            avg_pnl: self.avg_pnl(),
            max_drawdown: self.max_drawdown(),
            sharpe_ratio: self.sharpe_ratio(),
            profit_factor: metrics::profit_factor(&self.trades),
            exit_reasons: self.exit_reason_breakdown(),
        }
    }

    /// Human-readable multi-line report.
    pub fn summary(&self) -> String {
        let reasons = self.exit_reason_breakdown();
        let reasons = if reasons.is_empty() {
            "none".to_string()
        } else {
            reasons
                .iter()
                .map(|(reason, count)| format!("{reason}={count}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        [
            format!(
                "=== Backtest: {} on {} ({}) ===",
                self.strategy_name, self.market_id, self.token_label
            ),
            format!("Resolution  : {}", self.resolution),
            format!("Trades      : {}", self.n_trades()),
            format!(
                "Win rate    : {:.1}%  95% CI {}",
                self.win_rate() * 100.0,
                self.win_rate_ci()
            ),
            format!("Total P&L   : {:+.4} probability pts", self.total_pnl()),
            format!("Avg P&L     : {:+.4}", self.avg_pnl()),
            format!("Max drawdown: {:.4}", self.max_drawdown()),
            format!("Sharpe ratio: {:.3}", self.sharpe_ratio()),
            format!("Exit reasons: {reasons}"),
        ]
        .join("\n")
    }
}
