use crate::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub(crate) fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io { path: path.display().to_string(), source }
}

/// Serializes `value` to pretty JSON and installs it at `path` via write-to-temp +
/// atomic-rename, so a crash or concurrent reader never observes a partially written file
/// (SPEC_FULL.md §4.10).
pub async fn write_json_atomic<T: Serialize + Send + Sync + 'static>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(StoreError::Serialize)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_bytes_atomic(&path, &bytes))
        .await
        .expect("blocking write task panicked")
}

fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_err(dir, e))?;
    std::io::Write::write_all(&mut tmp, bytes).map_err(|e| io_err(path, e))?;
    tmp.persist(path).map_err(StoreError::Persist)?;
    Ok(())
}

/// Reads and deserializes `path` as JSON. A missing file is `Ok(None)`; a malformed file is
/// also `Ok(None)` — callers that need a hard I/O error can match on metadata separately, but
/// every reader named in SPEC_FULL.md §4.10/§4.11 treats both as "unavailable" rather than a
/// fatal condition.
pub async fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = tokio::fs::read(path).await.ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn account_path(dir: &Path, scenario_id: &str) -> PathBuf {
    dir.join(format!("paper-{scenario_id}.json"))
}
