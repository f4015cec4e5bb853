use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Utility for scaling position sizes and risk limits based on volatility.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct VolatilityScaler {
    /// Baseline volatility used when the scale factor is 1.0.
    pub base_volatility: Decimal,
    /// Minimum allowed scaling factor.
    pub min_scale: Decimal,
    /// Maximum allowed scaling factor.
    pub max_scale: Decimal,
}

impl VolatilityScaler {
    /// Calculate a scaling factor for the provided `volatility`.
    /// Values are clamped between `min_scale` and `max_scale`.
    pub fn scale(&self, volatility: Decimal) -> Decimal {
        if volatility <= Decimal::ZERO {
            return self.max_scale;
        }
        let mut factor = self.base_volatility / volatility;
        if factor < self.min_scale {
            factor = self.min_scale;
        } else if factor > self.max_scale {
            factor = self.max_scale;
        }
        factor
    }

    /// Adjust a base position size using the calculated scaling factor.
    pub fn adjust_position(&self, base_size: Decimal, volatility: Decimal) -> Decimal {
        base_size * self.scale(volatility)
    }

    /// Adjust a risk limit using the calculated scaling factor.
    pub fn adjust_risk(&self, base_limit: Decimal, volatility: Decimal) -> Decimal {
        base_limit * self.scale(volatility)
    }
}
