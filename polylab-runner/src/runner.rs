//! Backtest runner: wires the provider, cache, replay engine and result model.
//!
//! Entry points:
//! - `run()`: fetch (or load cached) data for one market, replay one token.
//! - `prefetch()`: warm the cache without running anything.
//! - `scan_market()`: fetch data and mine an entry profile from it.
//! - `run_batch()`: `run()` over many markets, isolating per-market failures.

use thiserror::Error;
use tracing::{debug, info, warn};

use polylab_core::data::{
    build_token_series, cache_key, normalize_metrics, BlobCache, DataError, FetchRequest,
    HttpProvider, MarketDataProvider, MarketPayload, MetricPoint,
};
use polylab_core::domain::Direction;
use polylab_core::engine::{replay, RunParams, DEFAULT_HISTORY_WINDOW};
use polylab_core::strategy::{
    scan_optimal_entries, EntryProfile, MinerError, ScanConfig, Strategy, StrategyError,
};

use crate::config::{ConfigError, RunnerConfig};
use crate::result::BacktestResult;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("miner error: {0}")]
    Miner(#[from] MinerError),
}

/// Outcome of a batch run: successes and per-market failures.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub results: Vec<BacktestResult>,
    pub failures: Vec<(String, RunError)>,
}

impl BatchSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_trades(&self) -> usize {
        self.results.iter().map(BacktestResult::n_trades).sum()
    }
}

pub struct BacktestRunner {
    provider: Box<dyn MarketDataProvider>,
    cache: Option<BlobCache>,
    history_window: usize,
}

impl BacktestRunner {
    /// Runner without a disk cache.
    pub fn new(provider: Box<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            cache: None,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_cache(mut self, cache: BlobCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window.max(1);
        self
    }

    /// HTTP-backed runner built from config. Fails if the API key variable
    /// is unset or the HTTP client cannot be built.
    pub fn from_config(config: &RunnerConfig) -> Result<Self, RunError> {
        let provider = HttpProvider::new(config.provider.http_config()?)?;
        Ok(Self::with_provider(Box::new(provider), config))
    }

    /// Runner over an arbitrary provider, taking cache and window from config.
    pub fn with_provider(provider: Box<dyn MarketDataProvider>, config: &RunnerConfig) -> Self {
        Self {
            provider,
            cache: config.cache.build(),
            history_window: config.engine.history_window.max(1),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn cache(&self) -> Option<&BlobCache> {
        self.cache.as_ref()
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Raw payload for `request` and whether the provider was called.
    ///
    /// A cache hit performs no network I/O. A miss fetches prices then books
    /// once each and stores the pair; a failed store is logged, not fatal.
    pub fn fetch_payload(&self, request: &FetchRequest) -> Result<(MarketPayload, bool), RunError> {
        let key = cache_key(
            &request.market_id,
            &request.start,
            &request.end,
            &request.resolution,
        );

        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.load(&key)? {
                return Ok((payload, false));
            }
        }

        info!(
            market_id = %request.market_id,
            provider = self.provider.name(),
            start = %request.start,
            end = %request.end,
            resolution = %request.resolution,
            "fetching market data"
        );
        let payload = MarketPayload {
            prices: self.provider.prices(request)?,
            books: self.provider.books(request)?,
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&key, request, &payload) {
                warn!(market_id = %request.market_id, error = %e, "failed to cache payload");
            }
        }
        Ok((payload, true))
    }

    /// Warm the cache for `request`. Returns true if a fetch happened.
    pub fn prefetch(&self, request: &FetchRequest) -> Result<bool, RunError> {
        let (_, fetched) = self.fetch_payload(request)?;
        Ok(fetched)
    }

    /// Backtest `strategy` on one token of one market.
    pub fn run(
        &self,
        strategy: &mut dyn Strategy,
        request: &FetchRequest,
        token_label: &str,
        params: &RunParams,
    ) -> Result<BacktestResult, RunError> {
        let (payload, _) = self.fetch_payload(request)?;
        let series = build_token_series(&payload, &request.market_id, token_label)?;

        let mut outcome = replay(strategy, &series, params, self.history_window);
        outcome.tag(&request.market_id, token_label);

        let mut result = BacktestResult::new(
            request.market_id.as_str(),
            token_label,
            request.resolution.as_str(),
            strategy.name(),
            strategy.params(),
        );
        result.trades = outcome.trades;
        result.bars_processed = outcome.bars_processed;

        info!(
            market_id = %request.market_id,
            token_label,
            strategy = %result.strategy_name,
            bars = outcome.bars_processed,
            strategy_calls = outcome.strategy_calls,
            trades = result.n_trades(),
            total_pnl = result.total_pnl(),
            "backtest complete"
        );
        Ok(result)
    }

    /// Fetch `request` and mine an entry profile for `token_label`.
    ///
    /// The profile's training market defaults to the request's market.
    pub fn scan_market(
        &self,
        request: &FetchRequest,
        token_label: &str,
        direction: Direction,
        config: &ScanConfig,
    ) -> Result<EntryProfile, RunError> {
        let (payload, _) = self.fetch_payload(request)?;
        let series = build_token_series(&payload, &request.market_id, token_label)?;
        let books = series.aligned_books();

        let mut config = config.clone();
        if config.training_market.is_empty() {
            config.training_market = request.market_id.clone();
        }
        Ok(scan_optimal_entries(&series.prices, &books, direction, &config)?)
    }

    /// Market-level metrics for `request`, sorted by time. Never cached.
    pub fn metrics(&self, request: &FetchRequest) -> Result<Vec<MetricPoint>, RunError> {
        let raw = self.provider.metrics(request)?;
        Ok(normalize_metrics(&raw))
    }

    /// Run a fresh strategy from `factory` over each market in turn.
    ///
    /// Every request in `requests` uses the same token label and params. A
    /// failing market is recorded and the batch continues.
    pub fn run_batch<F>(
        &self,
        requests: &[FetchRequest],
        token_label: &str,
        params: &RunParams,
        mut factory: F,
    ) -> BatchSummary
    where
        F: FnMut() -> Box<dyn Strategy>,
    {
        let mut summary = BatchSummary::default();
        for request in requests {
            let mut strategy = factory();
            match self.run(strategy.as_mut(), request, token_label, params) {
                Ok(result) => summary.results.push(result),
                Err(e) => {
                    warn!(market_id = %request.market_id, error = %e, "backtest failed");
                    summary.failures.push((request.market_id.clone(), e));
                }
            }
        }
        debug!(
            ok = summary.results.len(),
            failed = summary.failures.len(),
            "batch finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::{json, Value};

    use polylab_core::data::LabelledPoints;
    use polylab_core::strategy::RsiMeanReversion;

    /// In-memory provider that counts calls.
    struct FakeProvider {
        prices: LabelledPoints,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn flat(n: usize, price: f64) -> (Self, Arc<AtomicUsize>) {
            let points: Vec<Value> = (0..n)
                .map(|i| json!({"t": i as i64 * 3600, "p": price}))
                .collect();
            let mut prices = BTreeMap::new();
            prices.insert("YES".to_string(), points);
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    prices,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl MarketDataProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        fn prices(&self, _: &FetchRequest) -> Result<LabelledPoints, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.prices.clone())
        }

        fn books(&self, _: &FetchRequest) -> Result<LabelledPoints, DataError> {
            Ok(LabelledPoints::new())
        }

        fn metrics(&self, _: &FetchRequest) -> Result<Vec<Value>, DataError> {
            Ok(vec![
                json!({"ts": 7200, "spread": 0.02, "liquidity": 1000.0, "volume": 5.0}),
                json!({"ts": 3600, "spread": 0.03}),
            ])
        }
    }

    fn request() -> FetchRequest {
        FetchRequest::new("mkt-1", 0_i64, 200 * 3600_i64, "1h")
    }

    #[test]
    fn run_without_cache_fetches_every_time() {
        let (provider, calls) = FakeProvider::flat(60, 0.5);
        let runner = BacktestRunner::new(Box::new(provider));
        let mut strategy = RsiMeanReversion::default();
        runner
            .run(&mut strategy, &request(), "YES", &RunParams::default())
            .unwrap();
        runner
            .run(&mut strategy, &request(), "YES", &RunParams::default())
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn run_fills_result_identity() {
        let (provider, _) = FakeProvider::flat(60, 0.5);
        let runner = BacktestRunner::new(Box::new(provider)).with_history_window(10);
        let mut strategy = RsiMeanReversion::default();
        let result = runner
            .run(&mut strategy, &request(), "YES", &RunParams::default())
            .unwrap();
        assert_eq!(result.market_id, "mkt-1");
        assert_eq!(result.token_label, "YES");
        assert_eq!(result.resolution, "1h");
        assert_eq!(result.strategy_name, strategy.name());
        assert_eq!(result.bars_processed, 60);
        assert_eq!(result.n_trades(), result.trades.len());
    }

    #[test]
    fn prefetch_reports_whether_it_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, calls) = FakeProvider::flat(10, 0.5);
        let runner =
            BacktestRunner::new(Box::new(provider)).with_cache(BlobCache::new(dir.path()));
        assert!(runner.prefetch(&request()).unwrap());
        assert!(!runner.prefetch(&request()).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_label_is_data_unavailable() {
        let (provider, _) = FakeProvider::flat(10, 0.5);
        let runner = BacktestRunner::new(Box::new(provider));
        let mut strategy = RsiMeanReversion::default();
        let err = runner
            .run(&mut strategy, &request(), "NO", &RunParams::default())
            .unwrap_err();
        match err {
            RunError::Data(DataError::DataUnavailable { available, .. }) => {
                assert_eq!(available, vec!["YES".to_string()]);
            }
            other => panic!("expected DataUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn metrics_are_sorted() {
        let (provider, _) = FakeProvider::flat(10, 0.5);
        let runner = BacktestRunner::new(Box::new(provider));
        let metrics = runner.metrics(&request()).unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].timestamp, 3600);
        assert_eq!(metrics[1].volume, Some(5.0));
    }

    #[test]
    fn scan_on_flat_market_finds_nothing() {
        let (provider, _) = FakeProvider::flat(80, 0.5);
        let runner = BacktestRunner::new(Box::new(provider));
        let err = runner
            .scan_market(&request(), "YES", Direction::Buy, &ScanConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RunError::Miner(MinerError::NoQualifyingEntries { .. })
        ));
    }

    #[test]
    fn config_window_is_applied() {
        let (provider, _) = FakeProvider::flat(10, 0.5);
        let mut config = RunnerConfig::default();
        config.engine.history_window = 12;
        config.cache.dir = None;
        let runner = BacktestRunner::with_provider(Box::new(provider), &config);
        assert_eq!(runner.history_window(), 12);
        assert!(runner.cache().is_none());
        assert_eq!(runner.provider_name(), "fake");
    }
}
