use crate::correlation::pearson_correlation;
use halyard_instrument::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of the portfolio correlation-heat scaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatDecision {
    /// Heat is below the scaling threshold; size unadjusted.
    Clear,
    /// Heat exceeds the threshold; size scaled down continuously rather than rejected outright.
    Scaled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatAssessment {
    pub heat: Decimal,
    pub decision: HeatDecision,
    pub adjusted_ratio: Decimal,
}

/// Continuous portfolio-level correlation scaler: as a candidate symbol's average correlation
/// against already-held symbols rises, the position ratio is scaled down proportionally rather
/// than rejected outright by a hard threshold (that's the Signal Pipeline's correlation filter,
/// which this complements at the sizing stage).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct CorrelationHeat {
    /// Average correlation at or below which no scaling applies.
    pub threshold: Decimal,
    /// Average correlation at or above which the position ratio floors at `min_scale`.
    pub ceiling: Decimal,
    pub min_scale: Decimal,
}

impl CorrelationHeat {
    /// `held`: `(symbol, log_returns)` pairs for currently open positions.
    /// `candidate`: `(symbol, log_returns)` for the symbol being sized.
    pub fn assess(
        &self,
        held: &[(Symbol, Vec<Decimal>)],
        candidate: &(Symbol, Vec<Decimal>),
        base_ratio: Decimal,
    ) -> HeatAssessment {
        if held.is_empty() {
            return HeatAssessment { heat: Decimal::ZERO, decision: HeatDecision::Clear, adjusted_ratio: base_ratio };
        }

        let correlations: Vec<Decimal> = held
            .iter()
            .filter_map(|(_, returns)| pearson_correlation(returns, &candidate.1))
            .collect();

        if correlations.is_empty() {
            return HeatAssessment { heat: Decimal::ZERO, decision: HeatDecision::Clear, adjusted_ratio: base_ratio };
        }

        let heat = correlations.iter().sum::<Decimal>() / Decimal::from(correlations.len() as u64);

        if heat <= self.threshold {
            return HeatAssessment { heat, decision: HeatDecision::Clear, adjusted_ratio: base_ratio };
        }

        let span = (self.ceiling - self.threshold).max(Decimal::new(1, 6));
        let overshoot = ((heat - self.threshold) / span).min(Decimal::ONE);
        let scale = Decimal::ONE - overshoot * (Decimal::ONE - self.min_scale);
        HeatAssessment { heat, decision: HeatDecision::Scaled, adjusted_ratio: base_ratio * scale }
    }
}
