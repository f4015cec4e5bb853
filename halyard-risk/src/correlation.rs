use crate::alert::{RiskAlertHook, RiskViolation};
use halyard_instrument::Symbol;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::HashMap;

/// Manages correlation limits between symbol pairs, keyed regardless of argument order.
#[derive(Debug, Default, Clone)]
pub struct CorrelationMatrix {
    limits: HashMap<(Symbol, Symbol), Decimal>,
}

fn key(a: &Symbol, b: &Symbol) -> (Symbol, Symbol) {
    if a.as_str() <= b.as_str() {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl CorrelationMatrix {
    pub fn new() -> Self {
        Self { limits: HashMap::new() }
    }

    pub fn set_limit(&mut self, a: Symbol, b: Symbol, limit: Decimal) {
        self.limits.insert(key(&a, &b), limit);
    }

    pub fn check_limit(&self, a: Symbol, b: Symbol, correlation: Decimal, hook: &impl RiskAlertHook) {
        if let Some(limit) = self.limits.get(&key(&a, &b)) {
            if correlation > *limit {
                hook.alert(RiskViolation::CorrelationLimit {
                    symbols: (a, b),
                    correlation,
                    limit: *limit,
                });
            }
        }
    }
}

/// Pearson correlation coefficient of two equal-length log-return series.
///
/// Returns `None` when either series has fewer than two points or zero variance (a constant
/// series has an undefined correlation). Used by the Signal Pipeline's correlation filter to
/// reject opens that would concentrate risk into already-held, highly-correlated symbols.
pub fn pearson_correlation(a: &[Decimal], b: &[Decimal]) -> Option<Decimal> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let n = Decimal::from(a.len() as u64);
    let mean_a = a.iter().sum::<Decimal>() / n;
    let mean_b = b.iter().sum::<Decimal>() / n;

    let mut cov = Decimal::ZERO;
    let mut var_a = Decimal::ZERO;
    let mut var_b = Decimal::ZERO;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = *x - mean_a;
        let db = *y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a.is_zero() || var_b.is_zero() {
        return None;
    }
    let denom = (var_a * var_b).sqrt()?;
    Some(cov / denom)
}

/// Converts a K-line close price series into a log-return series (`ln(close[i] / close[i-1])`),
/// the input [`pearson_correlation`] expects.
pub fn log_returns(closes: &[Decimal]) -> Vec<Decimal> {
    closes
        .windows(2)
        .filter_map(|w| {
            if w[0] <= Decimal::ZERO || w[1] <= Decimal::ZERO {
                return None;
            }
            (w[1] / w[0]).checked_ln()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn identical_series_correlate_perfectly() {
        let a = vec![dec!(0.01), dec!(-0.02), dec!(0.03), dec!(0.01)];
        let corr = pearson_correlation(&a, &a).unwrap();
        assert!((corr - Decimal::ONE).abs() < dec!(0.0001));
    }

    #[test]
    fn inverted_series_correlate_negatively() {
        let a = vec![dec!(0.01), dec!(-0.02), dec!(0.03), dec!(0.01)];
        let b: Vec<Decimal> = a.iter().map(|v| -*v).collect();
        let corr = pearson_correlation(&a, &b).unwrap();
        assert!((corr + Decimal::ONE).abs() < dec!(0.0001));
    }

    #[test]
    fn constant_series_has_no_correlation() {
        let a = vec![dec!(1), dec!(1), dec!(1)];
        let b = vec![dec!(1), dec!(2), dec!(3)];
        assert!(pearson_correlation(&a, &b).is_none());
    }
}
