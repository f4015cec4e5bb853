use crate::runtime::ScenarioRuntime;
use chrono::Utc;
use halyard_store::HeartbeatStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One scenario driven on its own `tokio::time::interval`, independent of every other scenario
/// (SPEC_FULL.md §4.1 "ADDED — Top-level scheduler"). A tick that returns `Err` is logged and
/// the task keeps running on the next interval tick; the tick function itself never panics, so
/// there is nothing here to catch beyond the `Result`.
fn spawn_scenario_task(scenario_id: String, runtime: Arc<Mutex<ScenarioRuntime>>, tick_period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_period);
        loop {
            interval.tick().await;
            let now = Utc::now();
            let mut guard = runtime.lock().await;
            match guard.run_tick(now).await {
                Ok(summary) => {
                    if summary.halted {
                        warn!(scenario = %scenario_id, "scenario halted this tick");
                    }
                }
                Err(err) => error!(scenario = %scenario_id, %err, "scenario tick failed"),
            }
        }
    })
}

/// How stale a scenario's heartbeat must be, relative to its own tick period, before the
/// Watchdog raises an alert (SPEC_FULL.md §4.11: "default 3x the tick period").
const STALENESS_MULTIPLIER: i64 = 3;

/// How often two consecutive alerts for the same scenario may fire, so a scenario stuck past
/// the staleness threshold doesn't spam the log once per Watchdog interval.
const ALERT_COOLDOWN_MINUTES: i64 = 15;

/// Reads every enabled scenario's heartbeat on its own interval and raises a cooldown-guarded
/// alert when a scenario has gone quiet (SPEC_FULL.md §4.11). Never restarts a scenario itself —
/// that is left to an external process supervisor.
pub struct Watchdog {
    heartbeat_store: HeartbeatStore,
    scenario_tick_periods: HashMap<String, Duration>,
    last_alerted: HashMap<String, chrono::DateTime<Utc>>,
}

impl Watchdog {
    pub fn new(heartbeat_store: HeartbeatStore, scenario_tick_periods: HashMap<String, Duration>) -> Self {
        Self { heartbeat_store, scenario_tick_periods, last_alerted: HashMap::new() }
    }

    async fn check_once(&mut self) {
        let now = Utc::now();
        for (scenario_id, tick_period) in &self.scenario_tick_periods {
            let threshold = chrono::Duration::seconds(tick_period.as_secs() as i64 * STALENESS_MULTIPLIER);
            let stale = match self.heartbeat_store.read_heartbeat(scenario_id).await {
                Some(heartbeat) => now - heartbeat.last_run_at > threshold,
                None => true,
            };
            if !stale {
                continue;
            }
            let cooldown_elapsed = self
                .last_alerted
                .get(scenario_id)
                .map(|last| now - *last > chrono::Duration::minutes(ALERT_COOLDOWN_MINUTES))
                .unwrap_or(true);
            if cooldown_elapsed {
                error!(scenario = %scenario_id, "heartbeat stale, scenario may be stuck or crashed");
                self.last_alerted.insert(scenario_id.clone(), now);
            }
        }
    }

    /// Runs the watchdog loop forever on `interval`. Intended to be spawned as its own task
    /// alongside the scenario tasks.
    pub async fn run(mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }
}

/// Owns one `tokio::task` per enabled scenario plus the Watchdog task (SPEC_FULL.md §4.1).
/// Scenarios never share a task or a lock; `Scheduler` itself holds no scenario state beyond
/// the handles needed to shut them down.
pub struct Scheduler {
    scenario_handles: Vec<JoinHandle<()>>,
    watchdog_handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { scenario_handles: Vec::new(), watchdog_handle: None }
    }

    /// Registers one scenario to run on `tick_period`. Call before [`Scheduler::run`].
    pub fn add_scenario(&mut self, scenario_id: String, runtime: Arc<Mutex<ScenarioRuntime>>, tick_period: Duration) {
        info!(scenario = %scenario_id, period_secs = tick_period.as_secs(), "scheduling scenario");
        self.scenario_handles.push(spawn_scenario_task(scenario_id, runtime, tick_period));
    }

    /// Starts the Watchdog on `watchdog_period`, watching every scenario registered via
    /// [`Scheduler::add_scenario`] so far.
    pub fn start_watchdog(&mut self, heartbeat_store: HeartbeatStore, scenario_tick_periods: HashMap<String, Duration>, watchdog_period: Duration) {
        let watchdog = Watchdog::new(heartbeat_store, scenario_tick_periods);
        self.watchdog_handle = Some(tokio::spawn(watchdog.run(watchdog_period)));
    }

    /// Blocks until every scheduled task has finished. In normal operation this only returns
    /// on process shutdown (the individual scenario/watchdog loops run forever otherwise).
    pub async fn join(self) {
        for handle in self.scenario_handles {
            let _ = handle.await;
        }
        if let Some(handle) = self.watchdog_handle {
            let _ = handle.await;
        }
    }

    /// Aborts every scheduled task without waiting for the current tick to finish.
    pub fn shutdown(&self) {
        for handle in &self.scenario_handles {
            handle.abort();
        }
        if let Some(handle) = &self.watchdog_handle {
            handle.abort();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_heartbeat_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeartbeatStore::new(dir.path());
        let mut periods = HashMap::new();
        periods.insert("scenario-a".to_string(), Duration::from_secs(60));
        let mut watchdog = Watchdog::new(store, periods);
        watchdog.check_once().await;
        assert!(watchdog.last_alerted.contains_key("scenario-a"));
    }

    #[tokio::test]
    async fn fresh_heartbeat_is_not_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeartbeatStore::new(dir.path());
        store.write_heartbeat("scenario-a", Utc::now(), chrono::Duration::milliseconds(5)).await.unwrap();
        let mut periods = HashMap::new();
        periods.insert("scenario-a".to_string(), Duration::from_secs(60));
        let mut watchdog = Watchdog::new(store, periods);
        watchdog.check_once().await;
        assert!(!watchdog.last_alerted.contains_key("scenario-a"));
    }

    #[tokio::test]
    async fn repeated_alerts_are_cooldown_guarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeartbeatStore::new(dir.path());
        let mut periods = HashMap::new();
        periods.insert("scenario-a".to_string(), Duration::from_secs(60));
        let mut watchdog = Watchdog::new(store, periods);
        watchdog.check_once().await;
        let first_alert = watchdog.last_alerted.get("scenario-a").copied().unwrap();
        watchdog.check_once().await;
        let second_alert = watchdog.last_alerted.get("scenario-a").copied().unwrap();
        assert_eq!(first_alert, second_alert);
    }
}
