//! Completed round-trip trades.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::signal::{Direction, TradeSignal};
use super::Timestamp;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Timeout,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Timeout => "timeout",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed round-trip trade.
///
/// `entry_price` / `exit_price` are execution prices (best ask/bid, or the
/// bar mid when the book side was empty). P&L is in probability points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub signal: TradeSignal,
    pub entry_price: f64,
    pub exit_price: f64,
    pub exit_timestamp: Timestamp,
    pub exit_reason: ExitReason,
    /// Fraction charged on each leg (0.02 = 2% per side).
    pub fee_rate: f64,

    // ── Diagnostics (not used in P&L) ──
    pub entry_mid_price: f64,
    pub exit_mid_price: f64,
    pub bars_held: usize,
}

impl Trade {
    pub fn direction(&self) -> Direction {
        self.signal.direction
    }

    /// Signed directional move between the execution prices, before fees.
    pub fn gross_pnl(&self) -> f64 {
        (self.exit_price - self.entry_price) * self.signal.direction.sign()
    }

    /// Round-trip fee: `fee_rate × (entry + exit)`.
    ///
    /// A flat-rate stand-in for the venue's price-dependent fee curve, not an
    /// exact reproduction of it.
    pub fn fee_cost(&self) -> f64 {
        self.fee_rate * (self.entry_price + self.exit_price)
    }

    /// Net P&L after the round-trip fee.
    pub fn pnl(&self) -> f64 {
        self.gross_pnl() - self.fee_cost()
    }

    /// Net P&L as a fraction of the entry price.
    pub fn pnl_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.pnl() / self.entry_price
    }

    pub fn is_winner(&self) -> bool {
        self.pnl() > 0.0
    }
}
