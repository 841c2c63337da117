//! Polylab Runner: backtest orchestration, result statistics, config, export.
//!
//! This crate builds on `polylab-core` to provide:
//! - `BacktestRunner`: cached fetch → normalize → replay → result
//! - Result model with derived metrics and a text summary
//! - Wilson intervals, significance sizing, correlation and bootstrap stats
//! - TOML configuration, JSON/CSV export, tracing setup

pub mod config;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod result;
pub mod runner;
pub mod stats;

pub use config::{ConfigError, RunnerConfig};
pub use export::{
    export_json, import_json, trades_to_csv, write_result_json, write_trades_csv, ExportError,
};
pub use result::{BacktestResult, ResultStats, SCHEMA_VERSION};
pub use runner::{BacktestRunner, BatchSummary, RunError};
pub use stats::{
    bootstrap_mean_ci, effective_sample_size, is_significant, min_trades_for_significance,
    pearson, price_correlation_matrix, wilson_ci, BootstrapConfig, BootstrapInterval,
    ConfidenceInterval,
};
