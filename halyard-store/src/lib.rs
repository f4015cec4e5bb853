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

//! File-backed persistence for Halyard: per-scenario account state, signal history, TTL-gated
//! external caches and heartbeats.
//!
//! Every store in this crate treats "file missing" or "file malformed" as a normal,
//! non-error outcome rather than a fatal one — a scenario's first tick has no account file
//! yet, and a producer process writing `sentiment-cache.json` may be mid-write or down.

mod atomic;
mod error;

pub mod account;
pub mod cache;
pub mod equity;
pub mod heartbeat;
pub mod signal_history;
pub mod state;

pub use account::AccountStore;
pub use atomic::{read_json_lenient, write_json_atomic};
pub use cache::{CacheFile, CacheRead, is_present};
pub use equity::{EquityHistory, EquitySample};
pub use error::StoreError;
pub use heartbeat::{Heartbeat, HeartbeatStore};
pub use signal_history::SignalHistoryStore;
pub use state::{LastSignal, ScenarioState, ScenarioStateStore};
