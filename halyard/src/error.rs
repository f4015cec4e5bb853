use crate::config::ConfigError;
use halyard_execution::ExecutionError;
use halyard_instrument::InstrumentError;
use halyard_store::StoreError;
use thiserror::Error;

/// Top-level engine error. Everything downstream either already returns a typed, non-fatal
/// error (stores, the execution adapters), or is a configuration problem that must stop the
/// process before any scenario ticks (SPEC_FULL.md §7 "Fatal").
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error("scenario {0} not found")]
    UnknownScenario(String),
}
