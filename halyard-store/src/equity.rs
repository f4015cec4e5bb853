use crate::atomic::io_err;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// One row of `equity-history-{scenarioId}.jsonl` (SPEC_FULL.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// Append-only hourly equity curve, one file per scenario. No index: this is read back
/// sequentially for reporting, never patched in place, so a sidecar offset index (as used by
/// [`crate::SignalHistoryStore`]) would be pure overhead here.
#[derive(Debug, Clone)]
pub struct EquityHistory {
    path: PathBuf,
}

impl EquityHistory {
    pub fn new(dir: impl Into<std::path::PathBuf>, scenario_id: &str) -> Self {
        Self { path: dir.into().join(format!("equity-history-{scenario_id}.jsonl")) }
    }

    pub async fn append(&self, sample: EquitySample) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io_err(parent, e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| io_err(&self.path, e))?;
        let mut line = serde_json::to_vec(&sample).map_err(StoreError::Serialize)?;
        line.push(b'\n');
        file.write_all(&line).await.map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn appends_one_line_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let history = EquityHistory::new(dir.path(), "scenario-a");
        history.append(EquitySample { timestamp: Utc::now(), equity: dec!(1000) }).await.unwrap();
        history.append(EquitySample { timestamp: Utc::now(), equity: dec!(1010) }).await.unwrap();

        let contents = tokio::fs::read_to_string(dir.path().join("equity-history-scenario-a.jsonl")).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
