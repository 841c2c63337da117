//! Normalized, replay-ready series for one outcome token.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{BookSnapshot, PriceBar, Timestamp};

/// Price bars sorted ascending by timestamp plus a timestamp → book lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSeries {
    pub prices: Vec<PriceBar>,
    pub books: HashMap<Timestamp, BookSnapshot>,
}

impl TokenSeries {
    /// Build a series, sorting prices ascending and indexing books by
    /// timestamp. A later snapshot with a duplicate timestamp wins.
    pub fn new(mut prices: Vec<PriceBar>, books: Vec<BookSnapshot>) -> Self {
        prices.sort_by_key(|b| b.timestamp);
        let books = books.into_iter().map(|b| (b.timestamp, b)).collect();
        Self { prices, books }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Book aligned to `timestamp`, or an empty snapshot when none was fetched.
    pub fn book_at(&self, timestamp: Timestamp) -> BookSnapshot {
        self.books
            .get(&timestamp)
            .cloned()
            .unwrap_or_else(|| BookSnapshot::empty(timestamp))
    }

    /// Book snapshots in bar order (missing bars filled with empty books).
    pub fn aligned_books(&self) -> Vec<BookSnapshot> {
        self.prices.iter().map(|b| self.book_at(b.timestamp)).collect()
    }

    pub fn price_values(&self) -> Vec<f64> {
        self.prices.iter().map(|b| b.price).collect()
    }
}
