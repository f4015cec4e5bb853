use crate::atomic::{io_err, read_json_lenient, write_json_atomic};
use crate::error::StoreError;
use halyard_instrument::SignalHistoryRecord;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Append-only JSONL store for [`SignalHistoryRecord`]s with a `signal-index.json` sidecar
/// mapping id to byte offset (SPEC_FULL.md §4.10).
///
/// A status update (open -> closed/expired) never rewrites the file in place: the patched
/// record is appended at EOF and the index is repointed, leaving a stale line behind. Readers
/// always go through the index, so the stale line is never observed. All writers serialize
/// through `lock` — there is exactly one writer per scenario in practice, but the mutex makes
/// that an invariant rather than an assumption.
#[derive(Debug)]
pub struct SignalHistoryStore {
    data_path: PathBuf,
    index_path: PathBuf,
    lock: Mutex<()>,
}

impl SignalHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            data_path: dir.join("signal-history.jsonl"),
            index_path: dir.join("signal-index.json"),
            lock: Mutex::new(()),
        }
    }

    /// Writes a new record and indexes it. Overwrites any existing index entry for the same
    /// id (callers are expected to pass fresh ids; this is not a dedup check).
    pub async fn append(&self, record: &SignalHistoryRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut index = self.load_index().await;
        let offset = self.append_line(record).await?;
        index.insert(record.id.clone(), offset);
        self.save_index(&index).await
    }

    /// Applies `patch` to the record identified by `id` and re-indexes it. Returns `false`
    /// without writing anything if `id` is unknown.
    pub async fn patch<F>(&self, id: &str, patch: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut SignalHistoryRecord),
    {
        let _guard = self.lock.lock().await;
        let mut index = self.load_index().await;
        let Some(&offset) = index.get(id) else {
            return Ok(false);
        };
        let Some(mut record) = self.read_at(offset).await? else {
            return Ok(false);
        };
        patch(&mut record);
        let new_offset = self.append_line(&record).await?;
        index.insert(id.to_string(), new_offset);
        self.save_index(&index).await?;
        Ok(true)
    }

    pub async fn get(&self, id: &str) -> Result<Option<SignalHistoryRecord>, StoreError> {
        let index = self.load_index().await;
        let Some(&offset) = index.get(id) else {
            return Ok(None);
        };
        self.read_at(offset).await
    }

    async fn load_index(&self) -> HashMap<String, u64> {
        read_json_lenient(&self.index_path).await.unwrap_or_default()
    }

    async fn save_index(&self, index: &HashMap<String, u64>) -> Result<(), StoreError> {
        write_json_atomic(&self.index_path, index).await
    }

    async fn append_line(&self, record: &SignalHistoryRecord) -> Result<u64, StoreError> {
        if let Some(parent) = self.data_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io_err(parent, e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.data_path)
            .await
            .map_err(|e| io_err(&self.data_path, e))?;
        let offset = file.metadata().await.map_err(|e| io_err(&self.data_path, e))?.len();
        let mut line = serde_json::to_vec(record).map_err(StoreError::Serialize)?;
        line.push(b'\n');
        file.write_all(&line).await.map_err(|e| io_err(&self.data_path, e))?;
        Ok(offset)
    }

    async fn read_at(&self, offset: u64) -> Result<Option<SignalHistoryRecord>, StoreError> {
        let Ok(file) = tokio::fs::File::open(&self.data_path).await else {
            return Ok(None);
        };
        let mut reader = BufReader::new(file);
        if reader.seek(std::io::SeekFrom::Start(offset)).await.is_err() {
            return Ok(None);
        }
        let mut line = String::new();
        reader.read_line(&mut line).await.map_err(|e| io_err(&self.data_path, e))?;
        Ok(serde_json::from_str(line.trim_end()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use halyard_instrument::{SignalHistoryStatus, SignalType, Symbol};
    use rust_decimal_macros::dec;

    fn record(id: &str) -> SignalHistoryRecord {
        SignalHistoryRecord {
            id: id.to_string(),
            symbol: Symbol::from("BTCUSDT"),
            signal_type: SignalType::Buy,
            entry_price: dec!(100),
            entry_time: Utc::now(),
            entry_conditions: serde_json::json!({"rule": "rsi_oversold"}),
            status: SignalHistoryStatus::Open,
            exit_price: None,
            exit_time: None,
            exit_reason: None,
            pnl: None,
            pnl_percent: None,
            holding_hours: None,
        }
    }

    #[tokio::test]
    async fn append_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignalHistoryStore::new(dir.path());
        store.append(&record("sig-1")).await.unwrap();
        let fetched = store.get("sig-1").await.unwrap().unwrap();
        assert_eq!(fetched.symbol, Symbol::from("BTCUSDT"));
        assert_eq!(fetched.status, SignalHistoryStatus::Open);
    }

    #[tokio::test]
    async fn patch_updates_status_without_losing_earlier_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignalHistoryStore::new(dir.path());
        store.append(&record("sig-1")).await.unwrap();
        store.append(&record("sig-2")).await.unwrap();

        let patched = store
            .patch("sig-1", |r| {
                r.status = SignalHistoryStatus::Closed;
                r.exit_price = Some(dec!(110));
                r.pnl = Some(dec!(10));
            })
            .await
            .unwrap();
        assert!(patched);

        let sig1 = store.get("sig-1").await.unwrap().unwrap();
        assert_eq!(sig1.status, SignalHistoryStatus::Closed);
        assert_eq!(sig1.exit_price, Some(dec!(110)));

        let sig2 = store.get("sig-2").await.unwrap().unwrap();
        assert_eq!(sig2.status, SignalHistoryStatus::Open);
    }

    #[tokio::test]
    async fn patch_on_unknown_id_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignalHistoryStore::new(dir.path());
        let patched = store.patch("missing", |r| r.status = SignalHistoryStatus::Expired).await.unwrap();
        assert!(!patched);
    }

    #[tokio::test]
    async fn reapplying_the_same_patch_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignalHistoryStore::new(dir.path());
        store.append(&record("sig-1")).await.unwrap();

        let close = |r: &mut SignalHistoryRecord| {
            r.status = SignalHistoryStatus::Closed;
            r.exit_price = Some(dec!(110));
            r.pnl = Some(dec!(10));
        };
        store.patch("sig-1", close).await.unwrap();
        let once = store.get("sig-1").await.unwrap().unwrap();

        store.patch("sig-1", close).await.unwrap();
        let twice = store.get("sig-1").await.unwrap().unwrap();

        assert_eq!(once.status, twice.status);
        assert_eq!(once.exit_price, twice.exit_price);
        assert_eq!(once.pnl, twice.pnl);
    }
}
