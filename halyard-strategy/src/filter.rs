use crate::context::{Context, EventPhase, TrendDirection};
use halyard_instrument::{Symbol, SignalType};
use halyard_risk::pearson_correlation;
use rust_decimal::Decimal;

/// A filter either accepts the candidate signal unchanged, or rejects it with a reason string
/// (surfaced to the caller for logging/notification), or scales the position ratio in place.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Accept,
    Reject(String),
    ScaleRatio(Decimal),
}

/// Rejects a buy when the higher timeframe trend is bearish, and symmetrically for a short.
/// Sell/cover (closes) are never filtered here.
pub fn multi_timeframe_trend(signal_type: SignalType, ctx: &Context) -> FilterOutcome {
    match signal_type {
        SignalType::Buy if ctx.higher_timeframe_trend == TrendDirection::Bearish => {
            FilterOutcome::Reject("higher_timeframe_bearish".into())
        }
        SignalType::Short if ctx.higher_timeframe_trend == TrendDirection::Bullish => {
            FilterOutcome::Reject("higher_timeframe_bullish".into())
        }
        _ => FilterOutcome::Accept,
    }
}

/// Rejects when `(tp - entry) / (entry - sl) < min_rr` for a long, symmetric for a short.
pub fn risk_reward_prefilter(
    signal_type: SignalType,
    entry: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
    ctx: &Context,
) -> FilterOutcome {
    let (reward, risk) = match signal_type {
        SignalType::Buy => (take_profit - entry, entry - stop_loss),
        SignalType::Short => (entry - take_profit, stop_loss - entry),
        _ => return FilterOutcome::Accept,
    };
    if risk <= Decimal::ZERO {
        return FilterOutcome::Reject("non_positive_risk".into());
    }
    let rr = reward / risk;
    if rr < ctx.min_risk_reward {
        FilterOutcome::Reject(format!("risk_reward_below_minimum({rr})"))
    } else {
        FilterOutcome::Accept
    }
}

/// Rejects an open when its log-return correlation with any held symbol exceeds `threshold`.
pub fn correlation_filter(
    signal_type: SignalType,
    candidate: &(Symbol, Vec<Decimal>),
    threshold: Decimal,
    ctx: &Context,
) -> FilterOutcome {
    if !signal_type.opens_position() {
        return FilterOutcome::Accept;
    }
    for (held_symbol, held_returns) in &ctx.held_symbols {
        if let Some(corr) = pearson_correlation(held_returns, &candidate.1) {
            if corr > threshold {
                return FilterOutcome::Reject(format!("correlated_with_{held_symbol}"));
            }
        }
    }
    FilterOutcome::Accept
}

/// Rejects every open while the emergency halt flag is set; never blocks a close.
pub fn emergency_halt(signal_type: SignalType, ctx: &Context) -> FilterOutcome {
    if ctx.emergency_halt && signal_type.opens_position() {
        FilterOutcome::Reject("emergency_halt_active".into())
    } else {
        FilterOutcome::Accept
    }
}

/// During an event window: `during` blocks opens entirely; `pre`/`post` scale the position ratio
/// down (Open Question 1 resolution — treated as multiplicative, not merely advisory).
pub fn event_window(signal_type: SignalType, ctx: &Context, pre_post_scale: Decimal) -> FilterOutcome {
    match ctx.event_phase {
        Some(EventPhase::During) if signal_type.opens_position() => {
            FilterOutcome::Reject("event_window_during".into())
        }
        Some(EventPhase::Pre) | Some(EventPhase::Post) if signal_type.opens_position() => {
            FilterOutcome::ScaleRatio(pre_post_scale)
        }
        _ => FilterOutcome::Accept,
    }
}

/// Runs every filter in order, short-circuiting on the first rejection; accumulates any ratio
/// scaling from non-rejecting filters (eg/ the event window) and returns it alongside the final
/// accept/reject verdict.
pub fn run_filters(outcomes: impl IntoIterator<Item = FilterOutcome>) -> (Option<String>, Decimal) {
    let mut scale = Decimal::ONE;
    for outcome in outcomes {
        match outcome {
            FilterOutcome::Accept => {}
            FilterOutcome::Reject(reason) => return (Some(reason), scale),
            FilterOutcome::ScaleRatio(factor) => scale *= factor,
        }
    }
    (None, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_ctx() -> Context {
        Context {
            higher_timeframe_trend: TrendDirection::Neutral,
            held_symbols: Vec::new(),
            emergency_halt: false,
            event_phase: None,
            sentiment: None,
            min_risk_reward: dec!(1.5),
        }
    }

    #[test]
    fn mtf_filter_rejects_buy_against_bearish_higher_timeframe() {
        let ctx = Context { higher_timeframe_trend: TrendDirection::Bearish, ..base_ctx() };
        assert!(matches!(multi_timeframe_trend(SignalType::Buy, &ctx), FilterOutcome::Reject(_)));
    }

    #[test]
    fn rr_prefilter_rejects_below_minimum() {
        let ctx = base_ctx();
        let outcome =
            risk_reward_prefilter(SignalType::Buy, dec!(100), dec!(95), dec!(102), &ctx);
        assert!(matches!(outcome, FilterOutcome::Reject(_)));
    }

    #[test]
    fn emergency_halt_blocks_opens_not_closes() {
        let ctx = Context { emergency_halt: true, ..base_ctx() };
        assert!(matches!(emergency_halt(SignalType::Buy, &ctx), FilterOutcome::Reject(_)));
        assert_eq!(emergency_halt(SignalType::Sell, &ctx), FilterOutcome::Accept);
    }

    #[test]
    fn event_window_during_blocks_open_pre_scales() {
        let during = Context { event_phase: Some(EventPhase::During), ..base_ctx() };
        assert!(matches!(event_window(SignalType::Buy, &during, dec!(0.5)), FilterOutcome::Reject(_)));
        let pre = Context { event_phase: Some(EventPhase::Pre), ..base_ctx() };
        assert_eq!(event_window(SignalType::Buy, &pre, dec!(0.5)), FilterOutcome::ScaleRatio(dec!(0.5)));
    }

    #[test]
    fn run_filters_short_circuits_on_first_rejection() {
        let outcomes = vec![FilterOutcome::ScaleRatio(dec!(0.8)), FilterOutcome::Reject("x".into()), FilterOutcome::Accept];
        let (reason, scale) = run_filters(outcomes);
        assert_eq!(reason, Some("x".into()));
        assert_eq!(scale, dec!(0.8));
    }
}
