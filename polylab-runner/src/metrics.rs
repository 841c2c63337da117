//! Performance metrics: pure functions over a completed trade list.
//!
//! P&L is in probability points per unit position, net of fees. Cumulative
//! figures (drawdown) walk the trades in exit order.

use std::collections::BTreeMap;

use polylab_core::domain::{ExitReason, Trade};

// ─── Individual metric functions ────────────────────────────────────

pub fn win_count(trades: &[Trade]) -> usize {
    trades.iter().filter(|t| t.is_winner()).count()
}

/// Fraction of trades with positive net P&L; 0.0 with no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    win_count(trades) as f64 / trades.len() as f64
}

pub fn total_pnl(trades: &[Trade]) -> f64 {
    trades.iter().map(Trade::pnl).sum()
}

pub fn avg_pnl(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    total_pnl(trades) / trades.len() as f64
}

/// Largest peak-to-trough fall in cumulative net P&L.
///
/// The peak starts at zero, so a losing first trade already counts.
pub fn max_drawdown(trades: &[Trade]) -> f64 {
    let mut cumulative = 0.0;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for t in trades {
        cumulative += t.pnl();
        peak = peak.max(cumulative);
        max_dd = max_dd.max(peak - cumulative);
    }
    max_dd
}

/// Per-trade Sharpe: mean / sample std of net P&L, risk-free 0.
///
/// Returns 0.0 with fewer than 2 trades or zero dispersion.
pub fn sharpe_ratio(trades: &[Trade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let pnls: Vec<f64> = trades.iter().map(Trade::pnl).collect();
    let std = std_dev(&pnls);
    if std == 0.0 {
        return 0.0;
    }
    mean_f64(&pnls) / std
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().map(Trade::pnl).filter(|p| *p > 0.0).sum();
    let gross_loss: f64 = trades
        .iter()
        .map(Trade::pnl)
        .filter(|p| *p < 0.0)
        .map(f64::abs)
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Longest run of non-winning trades.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() {
            current = 0;
        } else {
            current += 1;
            max_streak = max_streak.max(current);
        }
    }
    max_streak
}

/// Trade count per exit reason. Reasons that never occurred are absent.
pub fn exit_reason_breakdown(trades: &[Trade]) -> BTreeMap<ExitReason, usize> {
    let mut breakdown = BTreeMap::new();
    for t in trades {
        *breakdown.entry(t.exit_reason).or_insert(0) += 1;
    }
    breakdown
}

// ─── Helpers ─────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
pub(crate) mod test_support {
    use polylab_core::domain::{Direction, ExitReason, Trade, TradeSignal};

    /// A BUY trade entered at 0.50 whose exit realizes `pnl` (fee-free).
    pub fn make_trade(pnl: f64) -> Trade {
        make_trade_with(pnl, ExitReason::Timeout)
    }

    pub fn make_trade_with(pnl: f64, exit_reason: ExitReason) -> Trade {
        Trade {
            signal: TradeSignal::new(0, Direction::Buy, 0.5, 0.5),
            entry_price: 0.5,
            exit_price: 0.5 + pnl,
            exit_timestamp: 3600,
            exit_reason,
            fee_rate: 0.0,
            entry_mid_price: 0.5,
            exit_mid_price: 0.5 + pnl,
            bars_held: 1,
        }
    }
}
