//! Trade signals emitted by strategies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Timestamp;

/// Directional intent on the token's probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Expect the price to rise.
    Buy,
    /// Expect the price to fall.
    Sell,
    Hold,
}

impl Direction {
    /// +1 for Buy, -1 for Sell, 0 for Hold.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
            Direction::Hold => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
            Direction::Hold => "hold",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata value attached to a signal or a strategy parameter listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Flag(bool),
    Int(i64),
    Number(f64),
    Text(String),
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Number(v)
    }
}

impl From<usize> for MetaValue {
    fn from(v: usize) -> Self {
        MetaValue::Int(v as i64)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Flag(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Flag(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Number(n) => write!(f, "{n}"),
            MetaValue::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered key/value map used for signal metadata and strategy params.
pub type MetaMap = BTreeMap<String, MetaValue>;

/// A signal emitted by a strategy at one bar.
///
/// `market_id` and `token_label` may be left empty by the strategy; the
/// engine fills them in before the signal is recorded on a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub timestamp: Timestamp,
    pub market_id: String,
    pub token_label: String,
    pub direction: Direction,
    /// Mid price when the signal fired.
    pub price_at_signal: f64,
    /// Strategy-assigned conviction in [0, 1].
    pub confidence: f64,
    #[serde(default)]
    pub metadata: MetaMap,
}

impl TradeSignal {
    pub fn new(timestamp: Timestamp, direction: Direction, price: f64, confidence: f64) -> Self {
        Self {
            timestamp,
            market_id: String::new(),
            token_label: String::new(),
            direction,
            price_at_signal: price,
            confidence: confidence.clamp(0.0, 1.0),
            metadata: MetaMap::new(),
        }
    }

    /// Builder-style metadata insert.
    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn is_actionable(&self) -> bool {
        self.direction != Direction::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let s = TradeSignal::new(1, Direction::Buy, 0.5, 1.7);
        assert_eq!(s.confidence, 1.0);
        let s = TradeSignal::new(1, Direction::Sell, 0.5, -0.2);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn hold_is_not_actionable() {
        assert!(!TradeSignal::new(1, Direction::Hold, 0.5, 0.5).is_actionable());
        assert!(TradeSignal::new(1, Direction::Sell, 0.5, 0.5).is_actionable());
    }

    #[test]
    fn signal_serialization_roundtrip() {
        let s = TradeSignal::new(1_700_000_000, Direction::Buy, 0.42, 0.8)
            .with_meta("rsi", 22.5)
            .with_meta("zone", "favorite")
            .with_meta("confirmed", true);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"direction\":\"buy\""));
        let back: TradeSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
