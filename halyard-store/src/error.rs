use thiserror::Error;

/// Errors raised by persistence operations (SPEC_FULL.md §4.10/§4.11).
///
/// Every reader in this crate treats a missing or malformed file as "unavailable" rather than
/// propagating an error — these variants only surface for genuine I/O failures (disk full,
/// permission denied, a rename across filesystems).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to persist temp file: {0}")]
    Persist(#[source] tempfile::PersistError),
}
