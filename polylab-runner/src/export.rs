//! Result export: JSON with schema versioning, CSV trade tape.
//!
//! Persisted results carry `schema_version`; results written by a newer
//! version are rejected on load.

use std::path::Path;

use chrono::DateTime;
use serde::Serialize;
use thiserror::Error;

use polylab_core::domain::{Timestamp, Trade};

use crate::result::{BacktestResult, ResultStats, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV output is not valid UTF-8")]
    Utf8,
    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

// ─── JSON export ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ResultDocument<'a> {
    result: &'a BacktestResult,
    stats: ResultStats,
}

/// Pretty JSON document `{result, stats}`.
pub fn export_json(result: &BacktestResult) -> Result<String, ExportError> {
    let doc = ResultDocument {
        result,
        stats: result.stats(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parse a document written by [`export_json`] (or a bare result).
pub fn import_json(json: &str) -> Result<BacktestResult, ExportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let inner = match value.get("result") {
        Some(result) => result.clone(),
        None => value,
    };
    let result: BacktestResult = serde_json::from_value(inner)?;
    if result.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: result.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(result)
}

pub fn write_result_json(path: impl AsRef<Path>, result: &BacktestResult) -> Result<(), ExportError> {
    let json = export_json(result)?;
    write_atomic(path.as_ref(), json.as_bytes())
}

// ─── CSV export ─────────────────────────────────────────────────────

fn iso(ts: Timestamp) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

/// Trade tape as CSV, one row per trade in exit order.
///
/// Columns: market_id, token_label, direction, entry_time, exit_time,
/// entry_price, exit_price, entry_mid, exit_mid, bars_held, exit_reason,
/// fee_rate, gross_pnl, fee_cost, pnl, pnl_pct, confidence
pub fn trades_to_csv(trades: &[Trade]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "market_id",
        "token_label",
        "direction",
        "entry_time",
        "exit_time",
        "entry_price",
        "exit_price",
        "entry_mid",
        "exit_mid",
        "bars_held",
        "exit_reason",
        "fee_rate",
        "gross_pnl",
        "fee_cost",
        "pnl",
        "pnl_pct",
        "confidence",
    ])?;

    for t in trades {
        let row: [String; 17] = [
            t.signal.market_id.clone(),
            t.signal.token_label.clone(),
            t.direction().to_string(),
            iso(t.signal.timestamp),
            iso(t.exit_timestamp),
            format!("{:.6}", t.entry_price),
            format!("{:.6}", t.exit_price),
            format!("{:.6}", t.entry_mid_price),
            format!("{:.6}", t.exit_mid_price),
            t.bars_held.to_string(),
            t.exit_reason.to_string(),
            format!("{:.4}", t.fee_rate),
            format!("{:.6}", t.gross_pnl()),
            format!("{:.6}", t.fee_cost()),
            format!("{:.6}", t.pnl()),
            format!("{:.4}", t.pnl_pct()),
            format!("{:.3}", t.signal.confidence),
        ];
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    String::from_utf8(data).map_err(|_| ExportError::Utf8)
}

pub fn write_trades_csv(path: impl AsRef<Path>, trades: &[Trade]) -> Result<(), ExportError> {
    let csv = trades_to_csv(trades)?;
    write_atomic(path.as_ref(), csv.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::make_trade;

    fn sample_result() -> BacktestResult {
        let mut result = BacktestResult::new("mkt-1", "YES", "1h", "RSIMeanReversion", Default::default());
        result.trades = vec![make_trade(0.10), make_trade(-0.05)];
        result.bars_processed = 100;
        result
    }

    #[test]
    fn csv_has_header_and_one_row_per_trade() {
        let csv = trades_to_csv(&sample_result().trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("market_id,token_label,direction"));
        assert!(lines[1].contains("0.600000"));
    }

    #[test]
    fn empty_tape_is_header_only() {
        let csv = trades_to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn json_document_round_trips() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["stats"]["n_trades"], 2);
        let back = import_json(&json).unwrap();
        assert_eq!(back.market_id, "mkt-1");
        assert_eq!(back.n_trades(), 2);
        assert_eq!(back.bars_processed, 100);
    }

    #[test]
    fn rejects_newer_schema() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&result).unwrap();
        assert!(matches!(
            import_json(&json),
            Err(ExportError::UnsupportedSchema { .. })
        ));
    }

    #[test]
    fn writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        let json_path = dir.path().join("out/result.json");
        let csv_path = dir.path().join("out/trades.csv");
        write_result_json(&json_path, &result).unwrap();
        write_trades_csv(&csv_path, &result.trades).unwrap();
        let json = std::fs::read_to_string(&json_path).unwrap();
        assert_eq!(import_json(&json).unwrap().n_trades(), 2);
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap().lines().count(), 3);
        assert!(!dir.path().join("out/result.tmp").exists());
    }
}
