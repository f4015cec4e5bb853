use crate::alert::{RiskAlertHook, RiskViolation};
use halyard_instrument::Symbol;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Tracks notional exposure per symbol.
#[derive(Debug, Default, Clone)]
pub struct ExposureTracker {
    exposures: HashMap<Symbol, Decimal>,
}

impl ExposureTracker {
    pub fn new() -> Self {
        Self { exposures: HashMap::new() }
    }

    pub fn update(&mut self, symbol: Symbol, notional: Decimal) {
        *self.exposures.entry(symbol).or_insert(Decimal::ZERO) += notional;
    }

    pub fn exposure(&self, symbol: &Symbol) -> Decimal {
        *self.exposures.get(symbol).unwrap_or(&Decimal::ZERO)
    }

    pub fn check_limit(&self, symbol: Symbol, limit: Decimal, hook: &impl RiskAlertHook) {
        let exposure = self.exposure(&symbol);
        if exposure > limit {
            hook.alert(RiskViolation::ExposureLimit { symbol, exposure, limit });
        }
    }
}
