//! Favorite/longshot bias.
//!
//! Low-priced outcomes tend to be overpriced and high-priced outcomes
//! underpriced. The strategy SELLs on entry into the longshot zone and BUYs on
//! entry into the favorite zone. It fires on zone transitions only, so a
//! price sitting inside a zone produces one signal, not one per bar.

use serde::{Deserialize, Serialize};

use super::{outside_band, param_map, ParamMap, StepContext, Strategy, StrategyError};
use crate::domain::{Direction, TradeSignal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongshotBiasParams {
    pub longshot_threshold: f64,
    pub favorite_threshold: f64,
    pub min_price: f64,
    pub max_price: f64,
}

impl Default for LongshotBiasParams {
    fn default() -> Self {
        Self {
            longshot_threshold: 0.35,
            favorite_threshold: 0.65,
            min_price: 0.04,
            max_price: 0.96,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Longshot,
    Neutral,
    Favorite,
}

impl Zone {
    fn as_str(self) -> &'static str {
        match self {
            Zone::Longshot => "longshot",
            Zone::Neutral => "neutral",
            Zone::Favorite => "favorite",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LongshotBias {
    params: LongshotBiasParams,
    prev_zone: Option<Zone>,
}

impl LongshotBias {
    pub fn new(params: LongshotBiasParams) -> Result<Self, StrategyError> {
        if params.longshot_threshold >= params.favorite_threshold {
            return Err(StrategyError::InvalidStrategyConfiguration(format!(
                "longshot_threshold ({}) must be strictly less than favorite_threshold ({})",
                params.longshot_threshold, params.favorite_threshold
            )));
        }
        Ok(Self {
            params,
            prev_zone: None,
        })
    }

    fn zone(&self, price: f64) -> Zone {
        if price <= self.params.longshot_threshold {
            Zone::Longshot
        } else if price >= self.params.favorite_threshold {
            Zone::Favorite
        } else {
            Zone::Neutral
        }
    }
}

impl Strategy for LongshotBias {
    fn name(&self) -> &str {
        "LongshotBias"
    }

    fn params(&self) -> ParamMap {
        let p = &self.params;
        param_map([
            ("longshot_threshold", p.longshot_threshold.into()),
            ("favorite_threshold", p.favorite_threshold.into()),
            ("min_price", p.min_price.into()),
            ("max_price", p.max_price.into()),
        ])
    }

    fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<TradeSignal> {
        let p = self.params;
        if outside_band(ctx.price, p.min_price, p.max_price) {
            self.prev_zone = None;
            return None;
        }

        let zone = self.zone(ctx.price);
        let prev = self.prev_zone.replace(zone);
        if prev == Some(zone) || zone == Zone::Neutral {
            return None;
        }

        let (direction, confidence) = match zone {
            Zone::Longshot => (
                Direction::Sell,
                (p.longshot_threshold - ctx.price) / p.longshot_threshold,
            ),
            _ => (
                Direction::Buy,
                (ctx.price - p.favorite_threshold) / (1.0 - p.favorite_threshold),
            ),
        };

        Some(
            TradeSignal::new(ctx.timestamp, direction, ctx.price, confidence.min(1.0))
                .with_meta("zone", zone.as_str())
                .with_meta("longshot_threshold", p.longshot_threshold)
                .with_meta("favorite_threshold", p.favorite_threshold),
        )
    }
}
