//! Payload normalization: raw provider JSON → `PriceBar` / `BookSnapshot`.
//!
//! Accepted shapes:
//! - prices: `{t|ts: <time>, p|price: <number>}`
//! - books:  `{t|ts: <time>, bids: [[price, size], ...], asks: [...]}`
//! - metrics: `{t|ts: <time>, spread, liquidity, volume}`
//!
//! Times are epoch seconds (numbers or numeric strings) or ISO-8601 strings
//! with or without an offset; a naive ISO time is taken as UTC. Anything that
//! doesn't parse becomes timestamp 0. Numbers may be JSON numbers or numeric
//! strings. A zero, null or empty field counts as absent when choosing between
//! the two field-name spellings.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use super::provider::{DataError, MarketPayload, MetricPoint};
use crate::domain::{BookLevel, BookSnapshot, PriceBar, Timestamp, TokenSeries};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Epoch seconds for a raw timestamp value; 0 when it can't be parsed.
pub fn parse_timestamp(value: &Value) -> Timestamp {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => parse_timestamp_str(s.trim()).unwrap_or(0),
        _ => 0,
    }
}

fn parse_timestamp_str(s: &str) -> Option<Timestamp> {
    if let Ok(ts) = s.parse::<i64>() {
        return Some(ts);
    }
    if let Ok(ts) = s.parse::<f64>() {
        return ts.is_finite().then_some(ts as i64);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    // offsets without a colon, e.g. +0000
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.timestamp());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// A JSON number or numeric string as f64.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// The first truthy field among `keys`, else the last key's value if present.
fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| is_truthy(v))
        .or_else(|| keys.last().and_then(|k| obj.get(*k)))
}

fn timestamp_of(obj: &Map<String, Value>) -> Timestamp {
    pick(obj, &["t", "ts"]).map(parse_timestamp).unwrap_or(0)
}

fn parse_level(value: &Value) -> Option<BookLevel> {
    match value {
        Value::Array(pair) if pair.len() >= 2 => {
            Some(BookLevel::new(as_number(&pair[0])?, as_number(&pair[1])?))
        }
        Value::Object(obj) => {
            let price = as_number(pick(obj, &["p", "price"])?)?;
            let size = as_number(pick(obj, &["s", "size"])?)?;
            Some(BookLevel::new(price, size))
        }
        _ => None,
    }
}

fn parse_levels(value: Option<&Value>) -> Vec<BookLevel> {
    value
        .and_then(Value::as_array)
        .map(|levels| levels.iter().filter_map(parse_level).collect())
        .unwrap_or_default()
}

/// Normalize raw price points, sorted ascending by timestamp.
/// Non-object entries are skipped; a missing price becomes 0.
pub fn normalize_prices(points: &[Value]) -> Vec<PriceBar> {
    let mut bars: Vec<PriceBar> = points
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            let price = pick(obj, &["p", "price"]).and_then(as_number).unwrap_or(0.0);
            PriceBar::new(timestamp_of(obj), price)
        })
        .collect();
    bars.sort_by_key(|b| b.timestamp);
    bars
}

/// Normalize raw book snapshots. Missing sides become empty.
pub fn normalize_books(points: &[Value]) -> Vec<BookSnapshot> {
    points
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| BookSnapshot {
            timestamp: timestamp_of(obj),
            bids: parse_levels(obj.get("bids")),
            asks: parse_levels(obj.get("asks")),
        })
        .collect()
}

pub fn normalize_metrics(points: &[Value]) -> Vec<MetricPoint> {
    let mut out: Vec<MetricPoint> = points
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| MetricPoint {
            timestamp: timestamp_of(obj),
            spread: obj.get("spread").and_then(as_number),
            liquidity: obj.get("liquidity").and_then(as_number),
            volume: obj.get("volume").and_then(as_number),
        })
        .collect();
    out.sort_by_key(|m| m.timestamp);
    out
}

/// Replay-ready series for `token_label`, or `DataUnavailable` listing the
/// labels that do have prices.
pub fn build_token_series(
    payload: &MarketPayload,
    market_id: &str,
    token_label: &str,
) -> Result<TokenSeries, DataError> {
    let raw_prices = payload
        .prices
        .get(token_label)
        .filter(|points| !points.is_empty())
        .ok_or_else(|| DataError::DataUnavailable {
            market_id: market_id.to_string(),
            token_label: token_label.to_string(),
            available: payload.price_labels(),
        })?;
    let books = payload
        .books
        .get(token_label)
        .map(|raw| normalize_books(raw))
        .unwrap_or_default();
    Ok(TokenSeries::new(normalize_prices(raw_prices), books))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numeric_timestamps() {
        assert_eq!(parse_timestamp(&json!(1_700_000_000)), 1_700_000_000);
        assert_eq!(parse_timestamp(&json!(1_700_000_000.9)), 1_700_000_000);
        assert_eq!(parse_timestamp(&json!("1700000000")), 1_700_000_000);
    }

    #[test]
    fn parses_iso_timestamps() {
        // 2024-10-01T06:00:00Z
        let expected = 1_727_762_400;
        assert_eq!(parse_timestamp(&json!("2024-10-01T06:00:00Z")), expected);
        assert_eq!(parse_timestamp(&json!("2024-10-01T06:00:00+00:00")), expected);
        assert_eq!(parse_timestamp(&json!("2024-10-01T08:00:00+02:00")), expected);
        assert_eq!(parse_timestamp(&json!("2024-10-01T06:00:00")), expected);
        assert_eq!(parse_timestamp(&json!("2024-10-01T06:00:00.000")), expected);
    }

    #[test]
    fn unparseable_timestamp_is_zero() {
        assert_eq!(parse_timestamp(&json!("yesterday")), 0);
        assert_eq!(parse_timestamp(&json!(null)), 0);
        assert_eq!(parse_timestamp(&json!([1])), 0);
    }

    #[test]
    fn prices_accept_both_field_spellings_and_sort() {
        let raw = vec![
            json!({"t": "2024-10-01T07:00:00Z", "p": 0.52}),
            json!({"ts": 1_727_762_400, "price": "0.50"}),
        ];
        let bars = normalize_prices(&raw);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0], PriceBar::new(1_727_762_400, 0.50));
        assert_eq!(bars[1], PriceBar::new(1_727_766_000, 0.52));
    }

    #[test]
    fn zero_short_field_falls_through_to_long_field() {
        let raw = vec![json!({"t": 0, "ts": 1_727_762_400, "p": 0, "price": 0.4})];
        assert_eq!(normalize_prices(&raw), vec![PriceBar::new(1_727_762_400, 0.4)]);
    }

    #[test]
    fn books_parse_levels() {
        let raw = vec![json!({
            "ts": 100,
            "bids": [[0.48, 100.0], ["0.47", "50"]],
            "asks": [{"price": 0.52, "size": 10.0}, ["bad"]]
        })];
        let books = normalize_books(&raw);
        assert_eq!(books[0].timestamp, 100);
        assert_eq!(books[0].bids, vec![BookLevel::new(0.48, 100.0), BookLevel::new(0.47, 50.0)]);
        assert_eq!(books[0].asks, vec![BookLevel::new(0.52, 10.0)]);
    }

    #[test]
    fn books_missing_sides_are_empty() {
        let books = normalize_books(&[json!({"t": 5})]);
        assert!(books[0].is_empty());
    }

    #[test]
    fn metrics_keep_optional_fields() {
        let m = normalize_metrics(&[json!({"ts": 10, "spread": 0.02, "volume": "1500"})]);
        assert_eq!(m[0].spread, Some(0.02));
        assert_eq!(m[0].liquidity, None);
        assert_eq!(m[0].volume, Some(1500.0));
    }

    #[test]
    fn missing_label_lists_available() {
        let mut payload = MarketPayload::default();
        payload.prices.insert("YES".into(), vec![json!({"t": 1, "p": 0.5})]);
        payload.prices.insert("NO".into(), vec![json!({"t": 1, "p": 0.5})]);
        match build_token_series(&payload, "mkt", "MAYBE") {
            Err(DataError::DataUnavailable { available, token_label, .. }) => {
                assert_eq!(token_label, "MAYBE");
                assert_eq!(available, vec!["NO".to_string(), "YES".to_string()]);
            }
            other => panic!("expected DataUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn series_aligns_books_by_timestamp() {
        let mut payload = MarketPayload::default();
        payload.prices.insert(
            "YES".into(),
            vec![json!({"t": 20, "p": 0.6}), json!({"t": 10, "p": 0.5})],
        );
        payload.books.insert(
            "YES".into(),
            vec![json!({"ts": 10, "bids": [[0.49, 1]], "asks": [[0.51, 1]]})],
        );
        let s = build_token_series(&payload, "mkt", "YES").unwrap();
        assert_eq!(s.prices[0].timestamp, 10);
        assert_eq!(s.book_at(10).best_bid(), Some(0.49));
        assert!(s.book_at(20).is_empty());
    }
}
