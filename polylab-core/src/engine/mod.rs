//! Replay engine: bar-by-bar simulation of one strategy on one token.
//!
//! Per bar, in strict order:
//! 1. Push price and book into the FIFO history windows.
//! 2. If a position is open, check take-profit → stop-loss → timeout.
//! 3. If flat and the windows are full, consult the strategy.
//! 4. Increment bars-held on the open position.
//!
//! A position still open after the last bar is closed with `EndOfData`.

pub mod execution;
pub mod replay;
pub mod state;
pub mod window;

pub use execution::{entry_execution_price, exit_execution_price};
pub use replay::{replay, ReplayOutcome, DEFAULT_HISTORY_WINDOW};
pub use state::{OpenPosition, PositionSlot, RunParams};
pub use window::HistoryWindow;
