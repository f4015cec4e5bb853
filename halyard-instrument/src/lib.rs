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

//! Core Halyard data model shared by every other `halyard-*` crate.
//!
//! This crate is deliberately free of I/O and async: it defines the value types (symbols,
//! candles, positions, accounts, signals) and the invariants a valid instance must uphold.
//! Everything that touches the filesystem or the network lives in `halyard-store` /
//! `halyard-execution`.

pub mod account;
pub mod error;
pub mod exchange;
pub mod kline;
pub mod position;
pub mod side;
pub mod signal;
pub mod symbol;

pub use account::{Account, DailyLoss, PendingOrder, Trade};
pub use error::InstrumentError;
pub use exchange::{ExchangeId, Market};
pub use kline::Kline;
pub use position::{Position, Trailing};
pub use side::{OrderSide, Side};
pub use signal::{CvdEntry, Signal, SignalHistoryRecord, SignalHistoryStatus, SignalType};
pub use symbol::{Symbol, Timeframe};
