use thiserror::Error;

/// Invariant violations raised by `halyard-instrument` constructors.
///
/// These are precondition errors (SPEC_FULL.md §7): callers are expected to surface them as a
/// rejection reason and move on, never to `panic!`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstrumentError {
    #[error("invalid kline: {0}")]
    InvalidKline(String),

    #[error("invalid position: {0}")]
    InvalidPosition(String),
}
