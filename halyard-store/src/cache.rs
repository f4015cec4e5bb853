use crate::atomic::write_json_atomic;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::PathBuf;

/// Outcome of a TTL-gated read (SPEC_FULL.md §4.10).
#[derive(Debug, Clone, PartialEq)]
pub enum CacheRead<T> {
    Fresh(T),
    Unavailable,
}

impl<T> CacheRead<T> {
    pub fn fresh(self) -> Option<T> {
        match self {
            CacheRead::Fresh(value) => Some(value),
            CacheRead::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope<T> {
    value: T,
    updated_at: DateTime<Utc>,
}

/// Generic read-through store for a value produced by an external ingestor and consumed by
/// scenario ticks: `sentiment-cache.json`, `onchain-cache.json`, `current-pairlist.json`,
/// `cvd-state.json` (SPEC_FULL.md §4.10). A missing file, a malformed file, and a stale file
/// are all `Unavailable` — none of them is an error.
#[derive(Debug)]
pub struct CacheFile<T> {
    path: PathBuf,
    ttl: chrono::Duration,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Send + Sync + 'static> CacheFile<T> {
    pub fn new(path: impl Into<PathBuf>, ttl: chrono::Duration) -> Self {
        Self { path: path.into(), ttl, _marker: PhantomData }
    }

    pub async fn read(&self, now: DateTime<Utc>) -> CacheRead<T> {
        let Ok(bytes) = tokio::fs::read(&self.path).await else {
            return CacheRead::Unavailable;
        };
        let Ok(envelope) = serde_json::from_slice::<Envelope<T>>(&bytes) else {
            return CacheRead::Unavailable;
        };
        if now - envelope.updated_at > self.ttl {
            CacheRead::Unavailable
        } else {
            CacheRead::Fresh(envelope.value)
        }
    }

    pub async fn write(&self, value: T, now: DateTime<Utc>) -> Result<(), StoreError> {
        write_json_atomic(&self.path, &Envelope { value, updated_at: now }).await
    }
}

/// Presence-based gate for `emergency-halt.json` and `kill-switch.flag`: existence of the file
/// means active, regardless of contents (SPEC_FULL.md §4.10, §4.11).
pub async fn is_present(path: &std::path::Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
