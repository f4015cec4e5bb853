use crate::alert::{RiskAlertHook, RiskViolation};
use halyard_instrument::Symbol;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Tracks realised/unrealised PnL to compute drawdown percentages.
#[derive(Debug, Default, Clone)]
pub struct DrawdownTracker {
    peak: HashMap<Symbol, Decimal>,
    current: HashMap<Symbol, Decimal>,
}

impl DrawdownTracker {
    pub fn new() -> Self {
        Self { peak: HashMap::new(), current: HashMap::new() }
    }

    pub fn update_pnl(&mut self, symbol: Symbol, pnl: Decimal) {
        let cur = self.current.entry(symbol.clone()).or_insert(Decimal::ZERO);
        *cur += pnl;
        let peak = self.peak.entry(symbol).or_insert(*cur);
        if *cur > *peak {
            *peak = *cur;
        }
    }

    pub fn drawdown(&self, symbol: &Symbol) -> Decimal {
        let cur = *self.current.get(symbol).unwrap_or(&Decimal::ZERO);
        let peak = *self.peak.get(symbol).unwrap_or(&cur);
        if peak.is_zero() { Decimal::ZERO } else { (peak - cur) / peak }
    }

    pub fn check_limit(&self, symbol: Symbol, limit: Decimal, hook: &impl RiskAlertHook) {
        let dd = self.drawdown(&symbol);
        if dd > limit {
            hook.alert(RiskViolation::DrawdownLimit { symbol, drawdown: dd, limit });
        }
    }
}
