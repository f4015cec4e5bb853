use crate::atomic::{read_json_lenient, write_json_atomic};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use halyard_instrument::{SignalType, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// The last signal type emitted for a symbol, used to suppress repeated identical signals
/// across ticks (SPEC_FULL.md §6 `state-{scenarioId}.json`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastSignal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub timestamp: DateTime<Utc>,
}

/// Run-control and dedup state for one scenario, independent of the account it trades with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioState {
    #[serde(default)]
    pub last_signals: HashMap<Symbol, LastSignal>,
    pub last_report_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paused: bool,
}

impl Default for ScenarioState {
    fn default() -> Self {
        Self { last_signals: HashMap::new(), last_report_at: None, paused: false }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioStateStore {
    dir: PathBuf,
}

impl ScenarioStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, scenario_id: &str) -> PathBuf {
        self.dir.join(format!("state-{scenario_id}.json"))
    }

    pub async fn load(&self, scenario_id: &str) -> ScenarioState {
        read_json_lenient(&self.path(scenario_id)).await.unwrap_or_default()
    }

    pub async fn save(&self, scenario_id: &str, state: &ScenarioState) -> Result<(), StoreError> {
        write_json_atomic(&self.path(scenario_id), state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_state_defaults_to_unpaused_with_no_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScenarioStateStore::new(dir.path());
        let state = store.load("scenario-a").await;
        assert!(!state.paused);
        assert!(state.last_signals.is_empty());
    }

    #[tokio::test]
    async fn pause_persists_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScenarioStateStore::new(dir.path());
        let mut state = store.load("scenario-a").await;
        state.paused = true;
        store.save("scenario-a", &state).await.unwrap();

        let reloaded = store.load("scenario-a").await;
        assert!(reloaded.paused);
    }

    #[tokio::test]
    async fn last_signal_round_trips_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScenarioStateStore::new(dir.path());
        let mut state = store.load("scenario-a").await;
        let symbol = Symbol::from("BTCUSDT");
        let now = Utc::now();
        state.last_signals.insert(symbol.clone(), LastSignal { signal_type: SignalType::Buy, timestamp: now });
        store.save("scenario-a", &state).await.unwrap();

        let reloaded = store.load("scenario-a").await;
        assert_eq!(reloaded.last_signals.get(&symbol).unwrap().signal_type, SignalType::Buy);
    }
}
