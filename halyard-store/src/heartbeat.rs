use crate::atomic::{read_json_lenient, write_json_atomic};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Liveness record a scenario tick writes on successful completion (SPEC_FULL.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub last_run_at: DateTime<Utc>,
    pub last_duration_ms: i64,
}

/// Last-write-wins heartbeat file per task, no locking beyond the atomic rename itself
/// (SPEC_FULL.md §4.10, §4.11).
#[derive(Debug, Clone)]
pub struct HeartbeatStore {
    dir: PathBuf,
}

impl HeartbeatStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, task: &str) -> PathBuf {
        self.dir.join(format!("heartbeat-{task}.json"))
    }

    pub async fn write_heartbeat(&self, task: &str, last_run_at: DateTime<Utc>, duration: chrono::Duration) -> Result<(), StoreError> {
        let heartbeat = Heartbeat { last_run_at, last_duration_ms: duration.num_milliseconds() };
        write_json_atomic(&self.path(task), &heartbeat).await
    }

    pub async fn read_heartbeat(&self, task: &str) -> Option<Heartbeat> {
        read_json_lenient(&self.path(task)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_task_has_no_heartbeat() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeartbeatStore::new(dir.path());
        assert!(store.read_heartbeat("scenario-a").await.is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeartbeatStore::new(dir.path());
        let now = Utc::now();
        store.write_heartbeat("scenario-a", now, chrono::Duration::milliseconds(250)).await.unwrap();
        let heartbeat = store.read_heartbeat("scenario-a").await.unwrap();
        assert_eq!(heartbeat.last_run_at, now);
        assert_eq!(heartbeat.last_duration_ms, 250);
    }

    #[tokio::test]
    async fn later_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeartbeatStore::new(dir.path());
        let first = Utc::now();
        let second = first + chrono::Duration::seconds(60);
        store.write_heartbeat("scenario-a", first, chrono::Duration::milliseconds(100)).await.unwrap();
        store.write_heartbeat("scenario-a", second, chrono::Duration::milliseconds(150)).await.unwrap();
        let heartbeat = store.read_heartbeat("scenario-a").await.unwrap();
        assert_eq!(heartbeat.last_run_at, second);
    }
}
