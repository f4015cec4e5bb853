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

//! Risk management utilities for Halyard trading systems.
//!
//! Exposure, drawdown, correlation and volatility tracking with an alerting hook, plus the
//! sizing primitives (Kelly, correlation heat) used by `halyard-strategy`'s sizing stage.

pub mod alert;
pub mod correlation;
pub mod drawdown;
pub mod exposure;
pub mod heat;
pub mod kelly;
pub mod position_tracker;
pub mod volatility;

pub use alert::{RiskAlertHook, RiskViolation, VecAlertHook};
pub use correlation::{log_returns, pearson_correlation, CorrelationMatrix};
pub use drawdown::DrawdownTracker;
pub use exposure::ExposureTracker;
pub use heat::{CorrelationHeat, HeatAssessment, HeatDecision};
pub use kelly::{KellyCalculator, TradeOutcome};
pub use position_tracker::PositionTracker;
pub use volatility::VolatilityScaler;
