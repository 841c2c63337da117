//! Execution price model.
//!
//! A BUY enters at the best ask and exits at the best bid; a SELL enters at
//! the best bid and exits at the best ask. When the side that would fill is
//! empty the bar's mid price is used instead, so missing or one-sided books
//! degrade to mid-price fills rather than aborting the run.

use crate::domain::{BookSnapshot, Direction};

/// Price paid to open a position in `direction`.
pub fn entry_execution_price(direction: Direction, book: &BookSnapshot, mid: f64) -> f64 {
    match direction {
        Direction::Buy => book.best_ask(),
        Direction::Sell => book.best_bid(),
        Direction::Hold => None,
    }
    .unwrap_or(mid)
}

/// Price received to close a position opened in `direction`.
pub fn exit_execution_price(direction: Direction, book: &BookSnapshot, mid: f64) -> f64 {
    match direction {
        Direction::Buy => book.best_bid(),
        Direction::Sell => book.best_ask(),
        Direction::Hold => None,
    }
    .unwrap_or(mid)
}
