use crate::context::Context;
use halyard_instrument::{Kline, Position, Side, Signal};
use halyard_ta::IndicatorSnapshot;
use rust_decimal::Decimal;

/// Result of `populate_signal`: the directional call plus the rule ids that fired, carried
/// through to `Signal::reason` and the Signal History entry-conditions blob.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub signal: Signal,
    pub triggered_rules: Vec<String>,
}

/// A strategy is a bundle implementing [`Strategy`]: `populate_signal` plus optional hooks, each
/// with a default no-op/pass-through implementation so a minimal strategy need only implement
/// `populate_signal`. This is object-safe dynamic dispatch (`Box<dyn Strategy>`) rather than
/// compile-time generics, matching how the engine loads one strategy per scenario from config at
/// runtime (SPEC_FULL.md §4.4 "Strategy plugin hooks").
pub trait Strategy: Send + Sync {
    /// Core signal-generation entry point: decides buy/sell/short/cover/none for one tick.
    fn populate_signal(&self, snapshot: &IndicatorSnapshot, ctx: &Context) -> RuleOutcome;

    /// Overrides the stop price the Exit Engine's break-even move would otherwise compute.
    /// Returning `None` defers entirely to the built-in break-even logic. The engine clamps
    /// whatever is returned to the hard stop-loss floor before applying it (SPEC_FULL.md §4.5
    /// item 4) — this hook cannot move the stop past the original risk budget.
    fn custom_stop_loss(&self, _position: &Position, _ctx: &Context) -> Option<Decimal> {
        None
    }

    /// Called before a programmatic exit is submitted; returning `false` vetoes the exit for
    /// this tick (eg/ a strategy that wants to hold through a single unfavourable bar).
    fn confirm_exit(&self, _position: &Position, _ctx: &Context) -> bool {
        true
    }

    /// Extra exit condition layered on top of the Exit Engine's built-in precedence chain.
    /// Returning `Some(reason)` forces an exit regardless of price.
    fn should_exit(&self, _position: &Position, _kline: &Kline, _ctx: &Context) -> Option<String> {
        None
    }

    /// Allows a strategy to scale the sizing-stage ratio before it is applied. The default
    /// passes the ratio through unchanged.
    fn adjust_position(&self, ratio: Decimal, _side: Side, _ctx: &Context) -> Decimal {
        ratio
    }

    /// Notified once a trade closes; the default implementation does nothing. Used by strategies
    /// that maintain their own rolling state across trades.
    fn on_trade_closed(&self, _position: &Position, _pnl: Decimal) {}
}
