//! MACD histogram crossover momentum.
//!
//! BUY when the histogram crosses from ≤ 0 to > 0, SELL on the mirror cross.
//! The previous histogram is forgotten whenever the price leaves the
//! `[min_price, max_price]` band, so the first in-band bar after an excursion
//! can never fire.

use serde::{Deserialize, Serialize};

use super::{outside_band, param_map, ParamMap, StepContext, Strategy};
use crate::domain::{Direction, TradeSignal};
use crate::indicators::{book_pressure, macd, momentum, trend_slope};

/// Histogram swing that maps to full confidence.
const FULL_CONFIDENCE_SWING: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdMomentumParams {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal_period: usize,
    pub min_histogram: f64,
    pub momentum_confirm: bool,
    pub momentum_period: usize,
    pub book_pressure_confirm: bool,
    pub book_depth: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub trend_filter: bool,
    pub trend_lookback: usize,
    pub trend_threshold: f64,
}

impl Default for MacdMomentumParams {
    fn default() -> Self {
        Self {
            macd_fast: 12,
            macd_slow: 26,
            macd_signal_period: 9,
            min_histogram: 0.0,
            momentum_confirm: false,
            momentum_period: 10,
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
pub struct MacdMomentum {
    params: MacdMomentumParams,
    prev_histogram: Option<f64>,
}

impl MacdMomentum {
    pub fn new(params: MacdMomentumParams) -> Self {
        Self {
            params,
            prev_histogram: None,
        }
    }
}

impl Strategy for MacdMomentum {
    fn name(&self) -> &str {
        "MACDMomentum"
    }

    fn params(&self) -> ParamMap {
        let p = &self.params;
        param_map([
            ("macd_fast", p.macd_fast.into()),
            ("macd_slow", p.macd_slow.into()),
            ("macd_signal_period", p.macd_signal_period.into()),
            ("min_histogram", p.min_histogram.into()),
            ("momentum_confirm", p.momentum_confirm.into()),
            ("momentum_period", p.momentum_period.into()),
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
        let p = self.params;
        if outside_band(ctx.price, p.min_price, p.max_price) {
            self.prev_histogram = None;
            return None;
        }

        let mc = macd(ctx.price_history, p.macd_fast, p.macd_slow, p.macd_signal_period)?;
        let hist = mc.histogram;
        let prev = self.prev_histogram.replace(hist)?;

        let bullish = prev <= 0.0 && hist > 0.0;
        let bearish = prev >= 0.0 && hist < 0.0;
        if !bullish && !bearish {
            return None;
        }
        if hist.abs() < p.min_histogram {
            return None;
        }

        if p.trend_filter {
            if let Some(slope) = trend_slope(ctx.price_history, p.trend_lookback) {
                if bearish && slope >= p.trend_threshold {
                    return None;
                }
                if bullish && slope <= -p.trend_threshold {
                    return None;
                }
            }
        }

        let mut mom = None;
        if p.momentum_confirm {
            let m = momentum(ctx.price_history, p.momentum_period)?;
            if (bullish && m <= 0.0) || (bearish && m >= 0.0) {
                return None;
            }
            mom = Some(m);
        }

        let mut pressure = None;
        if p.book_pressure_confirm {
            let bp = book_pressure(ctx.book, p.book_depth);
            if (bullish && bp <= 0.0) || (bearish && bp >= 0.0) {
                return None;
            }
            pressure = Some(bp);
        }

        let swing = (hist - prev).abs();
        let confidence = if swing > 0.0 {
            (swing / FULL_CONFIDENCE_SWING).min(1.0)
        } else {
            0.5
        };
        let direction = if bullish { Direction::Buy } else { Direction::Sell };

        let mut signal = TradeSignal::new(ctx.timestamp, direction, ctx.price, confidence)
            .with_meta("macd", mc.macd)
            .with_meta("signal_line", mc.signal)
            .with_meta("histogram", hist)
            .with_meta("prev_histogram", prev);
        if let Some(m) = mom {
            signal = signal.with_meta("momentum", m);
        }
        if let Some(bp) = pressure {
            signal = signal.with_meta("book_pressure", bp);
        }
        Some(signal)
    }
}
