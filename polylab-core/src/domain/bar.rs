//! Price bars and order book snapshots for one outcome token.

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// One bar of a token's price history. The price is a probability in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: Timestamp,
    pub price: f64,
}

impl PriceBar {
    pub fn new(timestamp: Timestamp, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// A single resting level in an order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

impl BookLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }

    /// Dollar value resting at this level.
    pub fn notional(&self) -> f64 {
        self.price * self.size
    }
}

/// Order book snapshot aligned to a bar timestamp.
///
/// Levels are stored as delivered by the provider (normally best-first).
/// The best-price accessors scan the whole side, so a mis-ordered feed still
/// yields the correct top of book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub timestamp: Timestamp,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl BookSnapshot {
    /// A snapshot with no levels on either side (missing-book bar).
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Highest bid price, if any bids rest.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.iter().map(|l| l.price).reduce(f64::max)
    }

    /// Lowest ask price, if any asks rest.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.iter().map(|l| l.price).reduce(f64::min)
    }

    pub fn total_bid_notional(&self) -> f64 {
        self.bids.iter().map(BookLevel::notional).sum()
    }

    pub fn total_ask_notional(&self) -> f64 {
        self.asks.iter().map(BookLevel::notional).sum()
    }
}
