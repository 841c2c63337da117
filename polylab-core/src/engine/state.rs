//! Run parameters and the single-position state machine.

use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, Timestamp, Trade, TradeSignal};

/// Exit thresholds and costs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Adverse directional move (probability points) that closes the position.
    pub stop_loss: f64,
    /// Favourable directional move that closes the position.
    pub take_profit: f64,
    /// Maximum bars held before a timeout exit.
    pub hold_periods: usize,
    /// Fee fraction charged on each leg.
    pub fee_rate: f64,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            stop_loss: 0.05,
            take_profit: 0.10,
            hold_periods: 24,
            fee_rate: 0.0,
        }
    }
}

/// A position opened by a signal and not yet closed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub signal: TradeSignal,
    /// Execution price paid on entry.
    pub entry_price: f64,
    /// Bar mid at entry; exit triggers measure moves from here.
    pub entry_mid_price: f64,
    pub bars_held: usize,
}

impl OpenPosition {
    pub fn new(signal: TradeSignal, entry_price: f64, entry_mid_price: f64) -> Self {
        Self {
            signal,
            entry_price,
            entry_mid_price,
            bars_held: 0,
        }
    }

    /// Signed move of `mid` from the entry mid, positive when favourable.
    pub fn directional_move(&self, mid: f64) -> f64 {
        (mid - self.entry_mid_price) * self.signal.direction.sign()
    }

    /// First exit trigger hit at `mid`, in priority order
    /// take-profit → stop-loss → timeout.
    pub fn exit_reason(&self, mid: f64, params: &RunParams) -> Option<ExitReason> {
        let mv = self.directional_move(mid);
        if mv >= params.take_profit {
            Some(ExitReason::TakeProfit)
        } else if mv <= -params.stop_loss {
            Some(ExitReason::StopLoss)
        } else if self.bars_held >= params.hold_periods {
            Some(ExitReason::Timeout)
        } else {
            None
        }
    }

    pub fn close(
        self,
        exit_price: f64,
        exit_mid_price: f64,
        exit_timestamp: Timestamp,
        exit_reason: ExitReason,
        fee_rate: f64,
    ) -> Trade {
        Trade {
            signal: self.signal,
            entry_price: self.entry_price,
            exit_price,
            exit_timestamp,
            exit_reason,
            fee_rate,
            entry_mid_price: self.entry_mid_price,
            exit_mid_price,
            bars_held: self.bars_held,
        }
    }
}

/// Flat → Open → Flat. At most one position exists at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PositionSlot {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionSlot {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionSlot::Open(_))
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        match self {
            PositionSlot::Open(p) => Some(p),
            PositionSlot::Flat => None,
        }
    }

    /// Move the open position out, leaving the slot flat.
    pub fn take(&mut self) -> Option<OpenPosition> {
        match std::mem::take(self) {
            PositionSlot::Open(p) => Some(p),
            PositionSlot::Flat => None,
        }
    }

    pub fn tick(&mut self) {
        if let PositionSlot::Open(p) = self {
            p.bars_held += 1;
        }
    }
}
