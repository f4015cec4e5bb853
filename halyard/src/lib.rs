#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! The Halyard scenario runtime: config loading, the Exit Engine, portfolio exposure, position
//! reconciliation and the top-level scheduler that ties per-scenario ticks together.
//!
//! `halyard-instrument`, `halyard-strategy`, `halyard-execution`, `halyard-risk`, `halyard-ta`
//! and `halyard-store` define the pieces this crate composes into [`runtime::ScenarioRuntime`].

pub mod config;
pub mod data;
pub mod error;
pub mod exit;
pub mod portfolio;
pub mod reconciler;
pub mod runtime;
pub mod scheduler;

pub use config::{load_scenario, ConfigError, LoadedScenario};
pub use error::EngineError;
pub use exit::{ExitConfig, ExitOutcome};
pub use portfolio::{symbols_over_limit, ExposureSummary};
pub use reconciler::{Discrepancy, PositionReconciler, ReconciliationReport, Severity};
pub use runtime::{ScenarioRuntime, TickSummary};
pub use scheduler::{Scheduler, Watchdog};
