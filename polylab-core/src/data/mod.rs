//! Market data: provider trait, payload normalization, and the disk cache.
//!
//! The provider returns raw JSON payloads exactly as the upstream API shapes
//! them. Those raw payloads are what the cache persists, so a cache hit and a
//! fresh fetch go through the same normalizer.

pub mod cache;
pub mod http;
pub mod normalize;
pub mod provider;

pub use cache::{cache_key, BlobCache, CachePolicy, CACHE_SCHEMA_VERSION};
pub use http::{HttpProvider, HttpProviderConfig};
pub use normalize::{
    build_token_series, normalize_books, normalize_metrics, normalize_prices, parse_timestamp,
};
pub use provider::{
    DataError, FetchRequest, LabelledPoints, MarketDataProvider, MarketPayload, MetricPoint,
    TimeBound,
};
