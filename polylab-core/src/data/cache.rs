//! Disk cache of raw market payloads, one JSON blob per fetch window.
//!
//! Layout: `{cache_dir}/{key}.json`
//!
//! - Keys hash the market id, minute-truncated bounds and resolution, so two
//!   requests inside the same minute share an entry.
//! - Blobs carry `schema_version`; any other version is a miss.
//! - Writes are atomic (write to a per-writer `.tmp` file, rename into place).
//! - Corrupt blobs are renamed to `{key}.json.quarantined` and read as a miss.
//! - Optional eviction (max age, max entries) runs after each write.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::provider::{DataError, FetchRequest, MarketPayload, TimeBound};

/// Bump when the blob layout changes; older blobs become misses.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

const KEY_HEX_LEN: usize = 16;

/// Cache key for one fetch window: first 16 hex chars of
/// `blake3("{market_id}|{start_min}|{end_min}|{resolution}")`.
pub fn cache_key(market_id: &str, start: &TimeBound, end: &TimeBound, resolution: &str) -> String {
    let raw = format!(
        "{market_id}|{}|{}|{resolution}",
        start.minute_bucket(),
        end.minute_bucket()
    );
    let hex = blake3::hash(raw.as_bytes()).to_hex();
    hex.as_str()[..KEY_HEX_LEN].to_string()
}

/// Eviction bounds. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Option<Duration>,
    pub max_entries: Option<usize>,
}

impl CachePolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    fn is_unbounded(&self) -> bool {
        self.max_age.is_none() && self.max_entries.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheBlob {
    #[serde(default)]
    schema_version: u32,
    key: String,
    market_id: String,
    resolution: String,
    fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    payload: MarketPayload,
}

/// The blob cache.
#[derive(Debug, Clone)]
pub struct BlobCache {
    cache_dir: PathBuf,
    policy: CachePolicy,
}

impl BlobCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_policy(cache_dir, CachePolicy::default())
    }

    pub fn with_policy(cache_dir: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            policy,
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Path to the blob for `key`: `{cache_dir}/{key}.json`
    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.json"))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blob_path(key).is_file()
    }

    /// Load the payload stored under `key`.
    ///
    /// `Ok(None)` on a miss: no blob, a different schema version, or a
    /// corrupt blob (which is quarantined first).
    pub fn load(&self, key: &str) -> Result<Option<MarketPayload>, DataError> {
        let path = self.blob_path(key);
        if !path.exists() {
            debug!(key, "cache miss");
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| DataError::Cache(format!("read {}: {e}", path.display())))?;

        let raw: Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                self.quarantine(&path, &e.to_string());
                return Ok(None);
            }
        };

        let version = raw.get("schema_version").and_then(Value::as_u64).unwrap_or(0);
        if version != u64::from(CACHE_SCHEMA_VERSION) {
            info!(key, version, expected = CACHE_SCHEMA_VERSION, "stale cache schema, refetching");
            return Ok(None);
        }

        match serde_json::from_value::<CacheBlob>(raw) {
            Ok(blob) => {
                info!(key, market_id = %blob.market_id, "cache hit");
                Ok(Some(blob.payload))
            }
            Err(e) => {
                self.quarantine(&path, &e.to_string());
                Ok(None)
            }
        }
    }

    /// Store `payload` under `key`, then apply the eviction policy.
    pub fn store(
        &self,
        key: &str,
        request: &FetchRequest,
        payload: &MarketPayload,
    ) -> Result<(), DataError> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::Cache(format!("failed to create dir: {e}")))?;

        let blob = CacheBlob {
            schema_version: CACHE_SCHEMA_VERSION,
            key: key.to_string(),
            market_id: request.market_id.clone(),
            resolution: request.resolution.clone(),
            fetched_at: Utc::now(),
            payload: payload.clone(),
        };
        let json = serde_json::to_vec(&blob)
            .map_err(|e| DataError::Cache(format!("blob serialization: {e}")))?;

        let path = self.blob_path(key);
        // per-writer temp file; concurrent stores of one key never share it
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{key}."))
            .suffix(".json.tmp")
            .tempfile_in(&self.cache_dir)
            .map_err(|e| DataError::Cache(format!("create temp file: {e}")))?;
        tmp.write_all(&json)
            .map_err(|e| DataError::Cache(format!("write {}: {e}", tmp.path().display())))?;
        tmp.persist(&path)
            .map_err(|e| DataError::Cache(format!("atomic rename failed: {}", e.error)))?;
        info!(key, market_id = %request.market_id, "cached payload");

        self.evict(key)
    }

    /// Remove blobs outside the policy, oldest first. `keep` is never evicted.
    fn evict(&self, keep: &str) -> Result<(), DataError> {
        if self.policy.is_unbounded() {
            return Ok(());
        }

        let keep_path = self.blob_path(keep);
        let mut entries: Vec<(SystemTime, PathBuf)> = Vec::new();
        let dir = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::Cache(format!("read dir: {e}")))?;
        for entry in dir {
            let entry = entry.map_err(|e| DataError::Cache(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") || path == keep_path {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, path));
        }
        entries.sort();

        let now = SystemTime::now();
        let mut doomed: Vec<PathBuf> = Vec::new();
        let mut survivors: Vec<PathBuf> = Vec::new();
        for (modified, path) in entries {
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            match self.policy.max_age {
                Some(max_age) if age >= max_age => doomed.push(path),
                _ => survivors.push(path),
            }
        }
        if let Some(max_entries) = self.policy.max_entries {
            // the blob just written occupies one slot
            let room = max_entries.max(1) - 1;
            let excess = survivors.len().saturating_sub(room);
            doomed.extend(survivors.drain(..excess));
        }

        for path in &doomed {
            match fs::remove_file(path) {
                // another writer evicted it first
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                other => other
                    .map_err(|e| DataError::Cache(format!("evict {}: {e}", path.display())))?,
            }
        }
        if !doomed.is_empty() {
            info!(evicted = doomed.len(), "cache eviction");
        }
        Ok(())
    }

    fn quarantine(&self, path: &Path, reason: &str) {
        let quarantined = path.with_extension("json.quarantined");
        warn!(path = %path.display(), reason, "quarantining corrupt cache blob");
        let _ = fs::rename(path, &quarantined);
    }
}
