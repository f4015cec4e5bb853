use halyard_instrument::InstrumentError;
use thiserror::Error;

/// Errors raised by the exchange client contract, the execution adapters and the order state
/// machine.
///
/// Defensive guarantees (SPEC_FULL.md §4.7): an invalid price never panics, it is rejected with
/// [`ExecutionError::InvalidPrice`]; every other variant is surfaced to the caller rather than
/// crashing a scenario tick.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("pre-trade check failed: {0}")]
    Rejected(#[from] RejectReason),

    #[error("exchange rate limited the request")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("exchange returned an error: {0}")]
    Exchange(String),

    #[error(transparent)]
    Instrument(#[from] InstrumentError),
}

/// Pre-trade check failures (SPEC_FULL.md §4.7), in the order they are evaluated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum RejectReason {
    #[error("max position count reached")]
    MaxPositions,
    #[error("symbol already held")]
    SymbolAlreadyHeld,
    #[error("daily loss limit breached")]
    DailyLossLimit,
    #[error("order size below minimum")]
    BelowMinOrderUsdt,
    #[error("entry slippage exceeds configured maximum")]
    ExcessiveSlippage,
}
