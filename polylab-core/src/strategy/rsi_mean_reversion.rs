//! RSI mean reversion.
//!
//! BUY when RSI drops below `oversold`, SELL when it rises above `overbought`.
//! Optional confirmations, applied in order: trend filter (suppress signals
//! against a strong prevailing move), Bollinger z-score, order book pressure.

use serde::{Deserialize, Serialize};

use super::{outside_band, param_map, ParamMap, StepContext, Strategy};
use crate::domain::{Direction, TradeSignal};
use crate::indicators::{bollinger, book_pressure, rsi, trend_slope};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiMeanReversionParams {
    pub rsi_period: usize,
    pub oversold_threshold: f64,
    pub overbought_threshold: f64,
    pub bb_confirm: bool,
    pub bb_period: usize,
    pub bb_z_min: f64,
    pub book_pressure_confirm: bool,
    pub book_depth: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub trend_filter: bool,
    pub trend_lookback: usize,
    pub trend_threshold: f64,
}

impl Default for RsiMeanReversionParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            oversold_threshold: 30.0,
            overbought_threshold: 70.0,
            bb_confirm: false,
            bb_period: 20,
            bb_z_min: 1.0,
            book_pressure_confirm: false,
            book_depth: 5,
            min_price: 0.03,
            max_price: 0.97,
            trend_filter: false,
            trend_lookback: 24,
            trend_threshold: 0.05,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RsiMeanReversion {
    params: RsiMeanReversionParams,
}

impl RsiMeanReversion {
    pub fn new(params: RsiMeanReversionParams) -> Self {
        Self { params }
    }
}

impl Strategy for RsiMeanReversion {
    fn name(&self) -> &str {
        "RSIMeanReversion"
    }

    fn params(&self) -> ParamMap {
        let p = &self.params;
        param_map([
            ("rsi_period", p.rsi_period.into()),
            ("oversold_threshold", p.oversold_threshold.into()),
            ("overbought_threshold", p.overbought_threshold.into()),
            ("bb_confirm", p.bb_confirm.into()),
            ("bb_period", p.bb_period.into()),
            ("bb_z_min", p.bb_z_min.into()),
            ("book_pressure_confirm", p.book_pressure_confirm.into()),
            ("book_depth", p.book_depth.into()),
            ("min_price", p.min_price.into()),
            ("max_price", p.max_price.into()),
            ("trend_filter", p.trend_filter.into()),
            ("trend_lookback", p.trend_lookback.into()),
            ("trend_threshold", p.trend_threshold.into()),
        ])
    }

    fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<TradeSignal> {
        let p = &self.params;
        if outside_band(ctx.price, p.min_price, p.max_price) {
            return None;
        }

        let rsi_val = rsi(ctx.price_history, p.rsi_period)?;
        let oversold = rsi_val < p.oversold_threshold;
        let overbought = rsi_val > p.overbought_threshold;
        if !oversold && !overbought {
            return None;
        }

        if p.trend_filter {
            if let Some(slope) = trend_slope(ctx.price_history, p.trend_lookback) {
                // overbought inside an uptrend / oversold inside a downtrend
                if overbought && slope >= p.trend_threshold {
                    return None;
                }
                if oversold && slope <= -p.trend_threshold {
                    return None;
                }
            }
        }

        let mut bb_z = None;
        if p.bb_confirm {
            let z = bollinger(ctx.price_history, p.bb_period, 2.0)?.z;
            if (oversold && z > -p.bb_z_min) || (overbought && z < p.bb_z_min) {
                return None;
            }
            bb_z = Some(z);
        }

        let mut pressure = None;
        if p.book_pressure_confirm {
            let bp = book_pressure(ctx.book, p.book_depth);
            if (oversold && bp <= 0.0) || (overbought && bp >= 0.0) {
                return None;
            }
            pressure = Some(bp);
        }

        let (direction, confidence) = if oversold {
            (
                Direction::Buy,
                (p.oversold_threshold - rsi_val) / p.oversold_threshold,
            )
        } else {
            (
                Direction::Sell,
                (rsi_val - p.overbought_threshold) / (100.0 - p.overbought_threshold),
            )
        };

        let mut signal = TradeSignal::new(ctx.timestamp, direction, ctx.price, confidence.min(1.0))
            .with_meta("rsi", rsi_val);
        if let Some(z) = bb_z {
            signal = signal.with_meta("bb_z", z);
        }
        if let Some(bp) = pressure {
            signal = signal.with_meta("book_pressure", bp);
        }
        Some(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookLevel, BookSnapshot};
    use crate::indicators::ramp;
    use crate::strategy::test_support::ctx;

    fn with(params: RsiMeanReversionParams) -> RsiMeanReversion {
        RsiMeanReversion::new(params)
    }

    #[test]
    fn oversold_emits_buy() {
        let prices = ramp(0.70, -0.01, 30);
        let book = BookSnapshot::empty(0);
        let last = *prices.last().unwrap();
        let sig = RsiMeanReversion::default().on_step(&ctx(last, &prices, &book)).unwrap();
        assert_eq!(sig.direction, Direction::Buy);
        assert!((sig.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overbought_emits_sell_without_trend_filter() {
        let prices = ramp(0.30, 0.01, 40);
        let book = BookSnapshot::empty(0);
        let sig = RsiMeanReversion::default().on_step(&ctx(0.69, &prices, &book)).unwrap();
        assert_eq!(sig.direction, Direction::Sell);
        assert_eq!(sig.confidence, 1.0);
    }

    #[test]
    fn trend_filter_suppresses_sell_in_uptrend() {
        let prices = ramp(0.30, 0.01, 40);
        let book = BookSnapshot::empty(0);
        let mut s = with(RsiMeanReversionParams {
            trend_filter: true,
            ..Default::default()
        });
        assert!(s.on_step(&ctx(0.69, &prices, &book)).is_none());
    }

    #[test]
    fn neutral_rsi_is_silent() {
        let prices: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 0.50 } else { 0.51 }).collect();
        let book = BookSnapshot::empty(0);
        assert!(RsiMeanReversion::default().on_step(&ctx(0.51, &prices, &book)).is_none());
    }

    #[test]
    fn price_outside_band_is_skipped() {
        let prices = ramp(0.16, -0.005, 30);
        let book = BookSnapshot::empty(0);
        assert!(RsiMeanReversion::default().on_step(&ctx(0.02, &prices, &book)).is_none());
    }

    #[test]
    fn bollinger_confirmation_passes_on_extended_move() {
        let prices = ramp(0.70, -0.01, 30);
        let book = BookSnapshot::empty(0);
        let mut s = with(RsiMeanReversionParams {
            bb_confirm: true,
            ..Default::default()
        });
        let sig = s.on_step(&ctx(0.41, &prices, &book)).unwrap();
        assert!(sig.metadata.contains_key("bb_z"));
    }

    #[test]
    fn book_pressure_confirmation() {
        let prices = ramp(0.70, -0.01, 30);
        let mut s = with(RsiMeanReversionParams {
            book_pressure_confirm: true,
            ..Default::default()
        });
        // empty book → pressure 0 → BUY not confirmed
        let empty = BookSnapshot::empty(0);
        assert!(s.on_step(&ctx(0.41, &prices, &empty)).is_none());

        let bid_heavy = BookSnapshot {
            timestamp: 0,
            bids: vec![BookLevel::new(0.40, 1000.0)],
            asks: vec![BookLevel::new(0.42, 100.0)],
        };
        let sig = s.on_step(&ctx(0.41, &prices, &bid_heavy)).unwrap();
        assert_eq!(sig.direction, Direction::Buy);
        assert!(sig.metadata.contains_key("book_pressure"));
    }

    #[test]
    fn insufficient_history_is_silent() {
        let book = BookSnapshot::empty(0);
        assert!(RsiMeanReversion::default().on_step(&ctx(0.5, &[0.5; 5], &book)).is_none());
    }
}
