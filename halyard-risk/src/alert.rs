use derive_more::Constructor;
use halyard_instrument::Symbol;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Enum describing various risk violations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Constructor)]
pub enum RiskViolation {
    ExposureLimit { symbol: Symbol, exposure: Decimal, limit: Decimal },
    DrawdownLimit { symbol: Symbol, drawdown: Decimal, limit: Decimal },
    CorrelationLimit { symbols: (Symbol, Symbol), correlation: Decimal, limit: Decimal },
}

/// Trait allowing consumers to receive risk alerts.
pub trait RiskAlertHook {
    fn alert(&self, violation: RiskViolation);
}

/// Simple alert hook that stores alerts in a vector, used by tests and CLI inspection tools.
#[derive(Default)]
pub struct VecAlertHook {
    pub alerts: Mutex<Vec<RiskViolation>>,
}

impl RiskAlertHook for VecAlertHook {
    fn alert(&self, violation: RiskViolation) {
        self.alerts.lock().push(violation);
    }
}
