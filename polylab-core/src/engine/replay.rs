//! The replay loop.

use tracing::debug;

use super::execution::{entry_execution_price, exit_execution_price};
use super::state::{OpenPosition, PositionSlot, RunParams};
use super::window::HistoryWindow;
use crate::domain::{BookSnapshot, Direction, ExitReason, TokenSeries, Trade};
use crate::strategy::{StepContext, Strategy};

/// Bars of history handed to strategies unless configured otherwise.
pub const DEFAULT_HISTORY_WINDOW: usize = 48;

/// What a replay produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayOutcome {
    /// Completed trades in exit order.
    pub trades: Vec<Trade>,
    pub bars_processed: usize,
    /// Bars on which the strategy was consulted.
    pub strategy_calls: usize,
}

impl ReplayOutcome {
    /// Stamp market and token identity onto signals that left them blank.
    pub fn tag(&mut self, market_id: &str, token_label: &str) {
        for trade in &mut self.trades {
            if trade.signal.market_id.is_empty() {
                trade.signal.market_id = market_id.to_string();
            }
            if trade.signal.token_label.is_empty() {
                trade.signal.token_label = token_label.to_string();
            }
        }
    }
}

/// Replay `series` through `strategy`.
///
/// Pure over its inputs apart from the strategy's own state: the same series,
/// parameters and freshly built strategy always give the same trades.
pub fn replay(
    strategy: &mut dyn Strategy,
    series: &TokenSeries,
    params: &RunParams,
    history_window: usize,
) -> ReplayOutcome {
    let mut prices = HistoryWindow::new(history_window);
    let mut books: HistoryWindow<BookSnapshot> = HistoryWindow::new(history_window);
    let mut slot = PositionSlot::Flat;
    let mut outcome = ReplayOutcome::default();

    for bar in &series.prices {
        let book = series.book_at(bar.timestamp);
        prices.push(bar.price);
        books.push(book.clone());
        outcome.bars_processed += 1;

        // ── Exits ──
        let reason = slot.position().and_then(|p| p.exit_reason(bar.price, params));
        if let Some(reason) = reason {
            if let Some(position) = slot.take() {
                let exit_price = exit_execution_price(position.signal.direction, &book, bar.price);
                let trade = position.close(exit_price, bar.price, bar.timestamp, reason, params.fee_rate);
                debug!(
                    direction = %trade.direction(),
                    exit_price,
                    reason = %reason,
                    pnl = trade.pnl(),
                    "exit"
                );
                outcome.trades.push(trade);
            }
        }

        // ── Entries ──
        if !slot.is_open() && prices.is_full() {
            outcome.strategy_calls += 1;
            let ctx = StepContext {
                timestamp: bar.timestamp,
                price: bar.price,
                book: &book,
                price_history: prices.as_slice(),
                book_history: books.as_slice(),
            };
            if let Some(signal) = strategy.on_step(&ctx) {
                if signal.direction != Direction::Hold {
                    let entry_price = entry_execution_price(signal.direction, &book, bar.price);
                    debug!(
                        direction = %signal.direction,
                        entry_price,
                        mid = bar.price,
                        confidence = signal.confidence,
                        "entry"
                    );
                    slot = PositionSlot::Open(OpenPosition::new(signal, entry_price, bar.price));
                }
            }
        }

        slot.tick();
    }

    if let (Some(position), Some(last)) = (slot.take(), series.prices.last()) {
        let book = series.book_at(last.timestamp);
        let exit_price = exit_execution_price(position.signal.direction, &book, last.price);
        let trade = position.close(
            exit_price,
            last.price,
            last.timestamp,
            ExitReason::EndOfData,
            params.fee_rate,
        );
        debug!(direction = %trade.direction(), exit_price, "closed at end of data");
        outcome.trades.push(trade);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookLevel, PriceBar, TradeSignal};
    use crate::strategy::ParamMap;
    use std::collections::BTreeSet;

    /// Fires `direction` on the listed bar timestamps.
    struct Scripted {
        fire_at: BTreeSet<i64>,
        direction: Direction,
        calls: Vec<i64>,
    }

    impl Scripted {
        fn new(direction: Direction, fire_at: &[i64]) -> Self {
            Self {
                fire_at: fire_at.iter().copied().collect(),
                direction,
                calls: Vec::new(),
            }
        }
    }

    impl Strategy for Scripted {
        fn name(&self) -> &str {
            "Scripted"
        }

        fn params(&self) -> ParamMap {
            ParamMap::new()
        }

        fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<TradeSignal> {
            self.calls.push(ctx.timestamp);
            assert_eq!(ctx.price_history.last(), Some(&ctx.price));
            self.fire_at
                .contains(&ctx.timestamp)
                .then(|| TradeSignal::new(ctx.timestamp, self.direction, ctx.price, 0.9))
        }
    }

    fn series(prices: &[f64]) -> TokenSeries {
        TokenSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| PriceBar::new(i as i64, p))
                .collect(),
            vec![],
        )
    }

    fn params(tp: f64, sl: f64, hold: usize) -> RunParams {
        RunParams {
            stop_loss: sl,
            take_profit: tp,
            hold_periods: hold,
            fee_rate: 0.0,
        }
    }

    #[test]
    fn strategy_waits_for_full_window() {
        let mut s = Scripted::new(Direction::Buy, &[]);
        replay(&mut s, &series(&[0.5; 10]), &RunParams::default(), 4);
        assert_eq!(s.calls, vec![3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn take_profit_after_jump() {
        let mut prices = vec![0.50; 49];
        prices.push(0.80);
        let mut s = Scripted::new(Direction::Buy, &[48]);
        let out = replay(&mut s, &series(&prices), &params(0.08, 0.05, 24), 48);
        assert_eq!(out.trades.len(), 1);
        let t = &out.trades[0];
        assert_eq!(t.exit_reason, ExitReason::TakeProfit);
        assert!((t.gross_pnl() - 0.30).abs() < 1e-12);
        assert_eq!(t.exit_timestamp, 49);
        assert_eq!(t.bars_held, 1);
    }

    #[test]
    fn stop_loss_for_sell() {
        let mut prices = vec![0.50; 5];
        prices.extend([0.52, 0.56, 0.57]);
        let mut s = Scripted::new(Direction::Sell, &[4]);
        let out = replay(&mut s, &series(&prices), &params(0.10, 0.05, 24), 5);
        assert_eq!(out.trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(out.trades[0].exit_timestamp, 6);
    }

    #[test]
    fn timeout_counts_entry_bar() {
        let mut s = Scripted::new(Direction::Buy, &[2]);
        let out = replay(&mut s, &series(&[0.5; 10]), &params(0.1, 0.1, 3), 3);
        // entered at bar 2, bars_held reaches 3 at the end of bar 4
        assert_eq!(out.trades[0].exit_reason, ExitReason::Timeout);
        assert_eq!(out.trades[0].exit_timestamp, 5);
    }

    #[test]
    fn strategy_not_consulted_while_open() {
        let mut s = Scripted::new(Direction::Buy, &[2, 3, 4]);
        let out = replay(&mut s, &series(&[0.5; 6]), &params(0.1, 0.1, 100), 3);
        assert_eq!(s.calls, vec![2]);
        assert_eq!(out.strategy_calls, 1);
        assert_eq!(out.trades.len(), 1);
    }

    #[test]
    fn reentry_on_exit_bar() {
        // exit by timeout at bar 3, strategy consulted again on the same bar
        let mut s = Scripted::new(Direction::Buy, &[2, 3]);
        let out = replay(&mut s, &series(&[0.5; 6]), &params(0.1, 0.1, 1), 3);
        assert_eq!(out.trades.len(), 2);
        assert_eq!(out.trades[0].exit_timestamp, 3);
        assert_eq!(out.trades[1].signal.timestamp, 3);
    }

    #[test]
    fn open_position_closed_at_end_of_data() {
        let mut s = Scripted::new(Direction::Buy, &[3]);
        let out = replay(&mut s, &series(&[0.5, 0.5, 0.5, 0.5, 0.52]), &RunParams::default(), 4);
        assert_eq!(out.trades.len(), 1);
        let t = &out.trades[0];
        assert_eq!(t.exit_reason, ExitReason::EndOfData);
        assert_eq!(t.exit_timestamp, 4);
        assert!((t.gross_pnl() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn hold_signal_opens_nothing() {
        let mut s = Scripted::new(Direction::Hold, &[2, 3]);
        let out = replay(&mut s, &series(&[0.5; 5]), &RunParams::default(), 3);
        assert!(out.trades.is_empty());
        assert_eq!(out.strategy_calls, 3);
    }

    #[test]
    fn empty_series_yields_nothing() {
        let mut s = Scripted::new(Direction::Buy, &[0]);
        let out = replay(&mut s, &TokenSeries::default(), &RunParams::default(), 3);
        assert_eq!(out, ReplayOutcome::default());
    }

    #[test]
    fn execution_prices_come_from_book() {
        let prices = vec![PriceBar::new(0, 0.5), PriceBar::new(1, 0.5), PriceBar::new(2, 0.5)];
        let book = |ts| BookSnapshot {
            timestamp: ts,
            bids: vec![BookLevel::new(0.49, 100.0)],
            asks: vec![BookLevel::new(0.51, 100.0)],
        };
        let series = TokenSeries::new(prices, vec![book(0), book(1), book(2)]);
        let mut s = Scripted::new(Direction::Buy, &[0]);
        let p = RunParams {
            fee_rate: 0.01,
            ..RunParams::default()
        };
        let out = replay(&mut s, &series, &p, 1);
        let t = &out.trades[0];
        assert_eq!(t.entry_price, 0.51);
        assert_eq!(t.exit_price, 0.49);
        assert_eq!(t.entry_mid_price, 0.5);
        assert!((t.gross_pnl() + 0.02).abs() < 1e-12);
        assert!((t.pnl() - (-0.02 - 0.01)).abs() < 1e-12);
    }

    #[test]
    fn tag_fills_blank_identity_only() {
        let mut s = Scripted::new(Direction::Buy, &[0]);
        let mut out = replay(&mut s, &series(&[0.5, 0.5]), &RunParams::default(), 1);
        out.tag("mkt", "YES");
        assert_eq!(out.trades[0].signal.market_id, "mkt");
        assert_eq!(out.trades[0].signal.token_label, "YES");
        out.trades[0].signal.market_id = "other".into();
        out.tag("mkt", "YES");
        assert_eq!(out.trades[0].signal.market_id, "other");
    }
}
