use halyard_ta::IndicatorSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market regime classification; each variant overrides the risk config (SL/TP percent, ROI
/// table, position-ratio multiplier) a scenario otherwise uses (SPEC_FULL.md §4.4 item 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    TrendingBull,
    TrendingBear,
    RangingTight,
    Breakout,
    Contraction,
}

/// Risk-config multipliers applied on top of a scenario's base [`crate::config::RiskOverrides`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RegimeOverride {
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
    pub position_ratio_multiplier: Decimal,
}

impl Regime {
    pub fn overrides(&self, base_sl: Decimal, base_tp: Decimal) -> RegimeOverride {
        match self {
            Regime::TrendingBull | Regime::TrendingBear => RegimeOverride {
                stop_loss_percent: base_sl,
                take_profit_percent: base_tp * Decimal::new(15, 1),
                position_ratio_multiplier: Decimal::ONE,
            },
            Regime::RangingTight => RegimeOverride {
                stop_loss_percent: base_sl * Decimal::new(7, 1),
                take_profit_percent: base_tp * Decimal::new(7, 1),
                position_ratio_multiplier: Decimal::new(75, 2),
            },
            Regime::Breakout => RegimeOverride {
                stop_loss_percent: base_sl * Decimal::new(12, 1),
                take_profit_percent: base_tp * Decimal::new(2, 0),
                position_ratio_multiplier: Decimal::new(12, 1),
            },
            Regime::Contraction => RegimeOverride {
                stop_loss_percent: base_sl * Decimal::new(5, 1),
                take_profit_percent: base_tp * Decimal::new(5, 1),
                position_ratio_multiplier: Decimal::new(5, 1),
            },
        }
    }
}

/// Classifies the current regime from trend direction, ATR-normalised volatility and whether
/// price sits at a multi-bar volatility extreme. `atr_percentile` is the caller-supplied
/// position of current ATR within its own recent history, in `[0, 1]`.
pub fn detect(snapshot: &IndicatorSnapshot, atr_percentile: Option<Decimal>) -> Regime {
    let trending_up = snapshot.ema_short.current > snapshot.ema_long.current;
    let trending_down = snapshot.ema_short.current < snapshot.ema_long.current;

    let percentile = atr_percentile.unwrap_or(Decimal::new(5, 1));

    if percentile >= Decimal::new(85, 2) {
        return Regime::Breakout;
    }
    if percentile <= Decimal::new(15, 2) {
        return Regime::Contraction;
    }
    if trending_up {
        return Regime::TrendingBull;
    }
    if trending_down {
        return Regime::TrendingBear;
    }
    Regime::RangingTight
}

#[cfg(test)]
mod tests {
    use super::*;
    use halyard_ta::WithPrev;
    use rust_decimal_macros::dec;

    fn snapshot(ema_short: Decimal, ema_long: Decimal) -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema_short: WithPrev { current: ema_short, previous: ema_short },
            ema_long: WithPrev { current: ema_long, previous: ema_long },
            rsi: dec!(50),
            macd: None,
            atr: None,
            vwap: None,
            cvd: None,
            buy_volume: None,
            sell_volume: None,
            volume: Decimal::ZERO,
            volume_average: Decimal::ZERO,
        }
    }

    #[test]
    fn high_atr_percentile_is_breakout_regardless_of_trend() {
        let snap = snapshot(dec!(110), dec!(100));
        assert_eq!(detect(&snap, Some(dec!(0.9))), Regime::Breakout);
    }

    #[test]
    fn uptrend_with_mid_volatility_is_trending_bull() {
        let snap = snapshot(dec!(110), dec!(100));
        assert_eq!(detect(&snap, Some(dec!(0.5))), Regime::TrendingBull);
    }

    #[test]
    fn flat_trend_with_mid_volatility_is_ranging() {
        let snap = snapshot(dec!(100), dec!(100));
        assert_eq!(detect(&snap, Some(dec!(0.5))), Regime::RangingTight);
    }
}
