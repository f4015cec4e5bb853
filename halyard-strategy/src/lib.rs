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

//! Signal Pipeline and strategy plugin contract for Halyard.
//!
//! Composes rule evaluation, position-aware gating, regime detection, filters, the sentiment
//! gate and sizing into the pipeline described by the engine's Signal Pipeline component; exposes
//! the `Strategy` trait a scenario's configured strategy implements.

pub mod config;
pub mod context;
pub mod filter;
pub mod gate;
pub mod regime;
pub mod rule;
pub mod sentiment;
pub mod sizing;
pub mod strategy;

pub use config::{SignalRuleSet, StrategyConfig};
pub use context::{Context, EventPhase, SentimentReading, TrendDirection};
pub use filter::FilterOutcome;
pub use gate::{gate, RuleFires};
pub use regime::{detect as detect_regime, Regime, RegimeOverride};
pub use rule::{evaluate, evaluate_all, Rule, RuleThresholds};
pub use sentiment::SentimentDecision;
pub use sizing::{position_ratio, AtrSizing, SizingContext};
pub use strategy::{RuleOutcome, Strategy};
