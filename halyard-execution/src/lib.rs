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

//! Execution Adapter, exchange client contract and Order State Machine for Halyard.
//!
//! Two implementations share one [`adapter::ExecutionAdapter`] contract: [`adapter::PaperAdapter`]
//! simulates fills against an [`halyard_instrument::Account`] directly, [`adapter::LiveAdapter`]
//! drives a real [`client::ExchangeClient`] and reconciles pending orders through
//! [`order_state::OrderStateMachine`].

pub mod adapter;
pub mod client;
pub mod error;
pub mod order_state;

pub use adapter::{AdapterConfig, ExecutionAdapter, LiveAdapter, PaperAdapter};
pub use client::{ExchangeClient, ExchangePosition, Fill, OrderReport, OrderStatus, SymbolInfo};
pub use error::{ExecutionError, RejectReason};
pub use order_state::{OrderStateEvent, OrderStateMachine};
