//! Domain types for prediction-market backtests.

pub mod bar;
pub mod series;
pub mod signal;
pub mod trade;

pub use bar::{BookLevel, BookSnapshot, PriceBar};
pub use series::TokenSeries;
pub use signal::{Direction, MetaMap, MetaValue, TradeSignal};
pub use trade::{ExitReason, Trade};

/// Unix epoch seconds.
pub type Timestamp = i64;
