use crate::alert::{RiskAlertHook, RiskViolation};
use halyard_instrument::Symbol;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Tracks net signed position quantity per symbol (positive = long, negative = short),
/// distinct from [`crate::exposure::ExposureTracker`]'s unsigned notional view.
#[derive(Debug, Default, Clone)]
pub struct PositionTracker {
    positions: HashMap<Symbol, Decimal>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self { positions: HashMap::new() }
    }

    pub fn update(&mut self, symbol: Symbol, qty: Decimal) {
        *self.positions.entry(symbol).or_insert(Decimal::ZERO) += qty;
    }

    pub fn position(&self, symbol: &Symbol) -> Decimal {
        *self.positions.get(symbol).unwrap_or(&Decimal::ZERO)
    }

    pub fn check_limit(&self, symbol: Symbol, limit: Decimal, hook: &impl RiskAlertHook) {
        let pos = self.position(&symbol);
        if pos.abs() > limit {
            hook.alert(RiskViolation::ExposureLimit { symbol, exposure: pos, limit });
        }
    }
}
