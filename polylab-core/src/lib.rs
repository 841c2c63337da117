//! PolyLab Core: prediction-market domain types, indicators, strategies,
//! the replay engine, and the market-data layer.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (price bars, book snapshots, signals, trades)
//! - Stateless indicators over trailing price slices and order books
//! - The `Strategy` trait and the built-in strategies
//! - Optimal-entry mining and the profile-matching strategy
//! - Bar-by-bar replay with book-aware execution and tp/sl/timeout exits
//! - Provider trait, HTTP provider, payload normalizer, and the blob cache

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;

pub use domain::{
    BookLevel, BookSnapshot, Direction, ExitReason, PriceBar, Timestamp, TokenSeries, Trade,
    TradeSignal,
};
pub use engine::{replay, ReplayOutcome, RunParams};
pub use strategy::{Strategy, StepContext};
