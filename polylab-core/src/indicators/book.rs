//! Order book microstructure indicators.

use crate::domain::{BookLevel, BookSnapshot};

/// Best ask − best bid. `None` if either side is empty.
pub fn book_spread(book: &BookSnapshot) -> Option<f64> {
    Some(book.best_ask()? - book.best_bid()?)
}

/// Notional bid weight: bid / (bid + ask). 0.5 when the book is empty.
pub fn book_imbalance(book: &BookSnapshot) -> f64 {
    let bid = book.total_bid_notional();
    let ask = book.total_ask_notional();
    let total = bid + ask;
    if total > 0.0 {
        bid / total
    } else {
        0.5
    }
}

/// ln(top-`depth` bid notional / top-`depth` ask notional).
///
/// Positive means buy-side pressure. Levels are re-sorted best-first before
/// the depth cut. Returns 0.0 when either side has no notional.
pub fn book_pressure(book: &BookSnapshot, depth: usize) -> f64 {
    let bid = top_notional(&book.bids, depth, |a, b| b.price.total_cmp(&a.price));
    let ask = top_notional(&book.asks, depth, |a, b| a.price.total_cmp(&b.price));
    if bid <= 0.0 || ask <= 0.0 {
        return 0.0;
    }
    (bid / ask).ln()
}

fn top_notional(
    levels: &[BookLevel],
    depth: usize,
    order: impl FnMut(&BookLevel, &BookLevel) -> std::cmp::Ordering,
) -> f64 {
    let mut sorted = levels.to_vec();
    sorted.sort_by(order);
    sorted.iter().take(depth).map(BookLevel::notional).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn book(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> BookSnapshot {
        BookSnapshot {
            timestamp: 0,
            bids: bids.iter().map(|&(p, s)| BookLevel::new(p, s)).collect(),
            asks: asks.iter().map(|&(p, s)| BookLevel::new(p, s)).collect(),
        }
    }

    #[test]
    fn spread_of_empty_side_is_none() {
        assert_eq!(book_spread(&book(&[(0.4, 10.0)], &[])), None);
        assert_eq!(book_spread(&book(&[], &[(0.6, 10.0)])), None);
    }

    #[test]
    fn spread_uses_extremes() {
        let b = book(&[(0.40, 1.0), (0.45, 1.0)], &[(0.55, 1.0), (0.50, 1.0)]);
        assert_approx(book_spread(&b).unwrap(), 0.05, 1e-12);
    }

    #[test]
    fn imbalance_empty_is_neutral() {
        assert_eq!(book_imbalance(&BookSnapshot::empty(0)), 0.5);
    }

    #[test]
    fn imbalance_weights_notional() {
        // bid 0.5*300 = 150, ask 0.5*100 = 50 → 0.75
        let b = book(&[(0.5, 300.0)], &[(0.5, 100.0)]);
        assert_approx(book_imbalance(&b), 0.75, DEFAULT_EPSILON);
    }

    #[test]
    fn pressure_one_sided_is_zero() {
        assert_eq!(book_pressure(&book(&[(0.5, 10.0)], &[]), 5), 0.0);
    }

    #[test]
    fn pressure_respects_depth_after_sorting() {
        // worst bid listed first; depth 1 must pick the 0.49 level
        let b = book(&[(0.10, 1000.0), (0.49, 100.0)], &[(0.51, 100.0), (0.90, 1000.0)]);
        let expected = (0.49_f64 * 100.0 / (0.51 * 100.0)).ln();
        assert_approx(book_pressure(&b, 1), expected, 1e-12);
    }

    #[test]
    fn pressure_balanced_is_zero() {
        let b = book(&[(0.5, 100.0)], &[(0.5, 100.0)]);
        assert_approx(book_pressure(&b, 5), 0.0, DEFAULT_EPSILON);
    }
}
