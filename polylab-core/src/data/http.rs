//! Blocking HTTP provider for the polymarketdata.co REST API.
//!
//! Every request sends `X-API-Key` and `Accept: application/json`. History
//! endpoints are cursor-paginated through `metadata.next_cursor`; label-keyed
//! pages (prices, books) are merged per label in page order. A 429 is retried
//! once after `Retry-After` seconds (61 when absent) when retry is enabled.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::provider::{DataError, FetchRequest, LabelledPoints, MarketDataProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.polymarketdata.co";

/// Wait used when a 429 carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 61;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub retry_on_rate_limit: bool,
    /// Page size sent as `limit` (the API caps it at 200).
    pub page_limit: u32,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            retry_on_rate_limit: true,
            page_limit: 200,
        }
    }
}

pub struct HttpProvider {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpProviderConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn send(&self, url: &str, query: &[(&str, String)]) -> Result<Response, DataError> {
        self.client
            .get(url)
            .header("X-API-Key", &self.config.api_key)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .map_err(|e| DataError::Network(e.to_string()))
    }

    /// One GET with the single rate-limit retry.
    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, DataError> {
        let url = self.url(path);
        for attempt in 0..2 {
            let resp = self.send(&url, query)?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(
                    resp.headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok()),
                );
                if self.config.retry_on_rate_limit && attempt == 0 {
                    warn!(retry_after, path, "rate limited; waiting before retry");
                    thread::sleep(Duration::from_secs(retry_after));
                    continue;
                }
                return Err(DataError::UpstreamRateLimited {
                    retry_after_secs: retry_after,
                });
            }

            let body = resp
                .text()
                .map_err(|e| DataError::Network(format!("failed to read body: {e}")))?;
            if !status.is_success() {
                return Err(DataError::UpstreamError {
                    status: status.as_u16(),
                    detail: error_detail(&body),
                });
            }
            return serde_json::from_str(&body).map_err(|e| {
                DataError::ResponseFormat(format!("invalid JSON from {path}: {e}"))
            });
        }
        Err(DataError::UpstreamRateLimited {
            retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
        })
    }

    /// Walk every page of a history endpoint, handing each `data` field to `on_page`.
    fn for_each_page(
        &self,
        path: &str,
        request: &FetchRequest,
        mut on_page: impl FnMut(&Value) -> Result<(), DataError>,
    ) -> Result<(), DataError> {
        let mut query = vec![
            ("start_ts", request.start.to_string()),
            ("end_ts", request.end.to_string()),
            ("resolution", request.resolution.clone()),
            ("limit", self.config.page_limit.to_string()),
        ];
        let mut pages = 0usize;
        loop {
            let page = self.get_json(path, &query)?;
            pages += 1;
            if let Some(data) = page.get("data") {
                on_page(data)?;
            }
            let Some(cursor) = next_cursor(&page) else {
                break;
            };
            let previous = query.iter().find(|(k, _)| *k == "cursor").map(|(_, v)| v);
            if previous == Some(&cursor) {
                warn!(path, cursor = %cursor, pages, "cursor did not advance; stopping pagination");
                break;
            }
            query.retain(|(k, _)| *k != "cursor");
            query.push(("cursor", cursor));
        }
        debug!(path, pages, "fetched");
        Ok(())
    }

    fn labelled(&self, endpoint: &str, request: &FetchRequest) -> Result<LabelledPoints, DataError> {
        let path = format!("/v1/markets/{}/{endpoint}", request.market_id);
        let mut merged = LabelledPoints::new();
        self.for_each_page(&path, request, |data| merge_labelled_page(&mut merged, data))?;
        Ok(merged)
    }
}

impl MarketDataProvider for HttpProvider {
    fn name(&self) -> &str {
        "polymarketdata"
    }

    fn prices(&self, request: &FetchRequest) -> Result<LabelledPoints, DataError> {
        self.labelled("prices", request)
    }

    fn books(&self, request: &FetchRequest) -> Result<LabelledPoints, DataError> {
        self.labelled("books", request)
    }

    fn metrics(&self, request: &FetchRequest) -> Result<Vec<Value>, DataError> {
        let path = format!("/v1/markets/{}/metrics", request.market_id);
        let mut points = Vec::new();
        self.for_each_page(&path, request, |data| {
            let items = data.as_array().ok_or_else(|| {
                DataError::ResponseFormat("metrics data is not a list".into())
            })?;
            points.extend(items.iter().cloned());
            Ok(())
        })?;
        Ok(points)
    }
}

/// Seconds to wait from a `Retry-After` header value.
pub(crate) fn parse_retry_after(header: Option<&str>) -> u64 {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// `detail` from a JSON error body, else the raw body text.
pub(crate) fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => match v.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

/// Non-empty `metadata.next_cursor`, if any.
pub(crate) fn next_cursor(page: &Value) -> Option<String> {
    match page.get("metadata")?.get("next_cursor")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Append one `{label: [points]}` page onto `acc`.
pub(crate) fn merge_labelled_page(acc: &mut LabelledPoints, data: &Value) -> Result<(), DataError> {
    let labels = data
        .as_object()
        .ok_or_else(|| DataError::ResponseFormat("expected label-keyed data object".into()))?;
    for (label, points) in labels {
        let points = points.as_array().ok_or_else(|| {
            DataError::ResponseFormat(format!("points for label '{label}' are not a list"))
        })?;
        acc.entry(label.clone())
            .or_default()
            .extend(points.iter().cloned());
    }
    Ok(())
}
