use halyard_ta::{IndicatorSnapshot, WithPrev};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A closed set of named atomic predicates over an [`IndicatorSnapshot`] plus a little external
/// context. Unknown rule identifiers (eg/ a stale config referencing a removed rule) evaluate to
/// `false` rather than raising — this is a duck-typed registry replaced by an explicit table, per
/// the design note on the rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    // Trend
    MaBullish,
    MaBearish,
    MaGoldenCross,
    MaDeathCross,
    // Momentum
    RsiOversold,
    RsiOverbought,
    RsiNotOverbought,
    RsiNotOversold,
    RsiBullishZone,
    RsiOverboughtExit,
    // MACD
    MacdBullish,
    MacdBearish,
    MacdGoldenCross,
    MacdDeathCross,
    MacdHistogramShrinking,
    // Volume / flow
    VolumeSurge,
    VolumeLow,
    CvdBullish,
    CvdBearish,
}

/// Thresholds consumed by the momentum-family rules; everything else is structural (cross,
/// sign) and needs no configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RuleThresholds {
    pub rsi_oversold: Decimal,
    pub rsi_overbought: Decimal,
    pub rsi_overbought_exit: Decimal,
    pub volume_surge_multiplier: Decimal,
    pub volume_low_multiplier: Decimal,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: Decimal::new(30, 0),
            rsi_overbought: Decimal::new(70, 0),
            rsi_overbought_exit: Decimal::new(75, 0),
            volume_surge_multiplier: Decimal::new(15, 1),
            volume_low_multiplier: Decimal::new(5, 1),
        }
    }
}

fn macd_histogram_shrinking(history: &[Decimal]) -> bool {
    // Three consecutive decreasing absolute histograms, falling back to two when only two
    // samples are available (SPEC_FULL.md §4.4).
    let abs: Vec<Decimal> = history.iter().map(|h| h.abs()).collect();
    match abs.len() {
        0 | 1 => false,
        2 => abs[1] < abs[0],
        _ => {
            let n = abs.len();
            abs[n - 1] < abs[n - 2] && abs[n - 2] < abs[n - 3]
        }
    }
}

/// Evaluates one [`Rule`] against a snapshot. `macd_histogram_history` should hold the last few
/// histogram values in chronological order (oldest first), including the current one.
pub fn evaluate(
    rule: Rule,
    snapshot: &IndicatorSnapshot,
    thresholds: &RuleThresholds,
    macd_histogram_history: &[Decimal],
) -> bool {
    match rule {
        Rule::MaBullish => snapshot.ema_short.current > snapshot.ema_long.current,
        Rule::MaBearish => snapshot.ema_short.current < snapshot.ema_long.current,
        Rule::MaGoldenCross => crossed_above(snapshot.ema_short, snapshot.ema_long),
        Rule::MaDeathCross => crossed_below(snapshot.ema_short, snapshot.ema_long),

        Rule::RsiOversold => snapshot.rsi < thresholds.rsi_oversold,
        Rule::RsiOverbought => snapshot.rsi > thresholds.rsi_overbought,
        Rule::RsiNotOverbought => snapshot.rsi <= thresholds.rsi_overbought,
        Rule::RsiNotOversold => snapshot.rsi >= thresholds.rsi_oversold,
        Rule::RsiBullishZone => snapshot.rsi >= Decimal::new(40, 0) && snapshot.rsi < thresholds.rsi_overbought,
        Rule::RsiOverboughtExit => snapshot.rsi > thresholds.rsi_overbought_exit,

        Rule::MacdBullish => snapshot.macd.is_some_and(|m| m.current.macd > m.current.signal),
        Rule::MacdBearish => snapshot.macd.is_some_and(|m| m.current.macd < m.current.signal),
        Rule::MacdGoldenCross => snapshot.macd.is_some_and(|m| {
            m.previous.macd <= m.previous.signal && m.current.macd > m.current.signal
        }),
        Rule::MacdDeathCross => snapshot.macd.is_some_and(|m| {
            m.previous.macd >= m.previous.signal && m.current.macd < m.current.signal
        }),
        Rule::MacdHistogramShrinking => macd_histogram_shrinking(macd_histogram_history),

        Rule::VolumeSurge => snapshot.volume_surge(thresholds.volume_surge_multiplier),
        Rule::VolumeLow => snapshot.volume_low(thresholds.volume_low_multiplier),
        Rule::CvdBullish => snapshot.cvd.is_some_and(|cvd| cvd > Decimal::ZERO),
        Rule::CvdBearish => snapshot.cvd.is_some_and(|cvd| cvd < Decimal::ZERO),
    }
}

fn crossed_above(fast: WithPrev<Decimal>, slow: WithPrev<Decimal>) -> bool {
    fast.previous <= slow.previous && fast.current > slow.current
}

fn crossed_below(fast: WithPrev<Decimal>, slow: WithPrev<Decimal>) -> bool {
    fast.previous >= slow.previous && fast.current < slow.current
}

/// Evaluates a conjunction of rules (AND over the set), short-circuiting false. An empty rule
/// set never fires (a scenario with no rules configured for a signal type emits nothing for it).
pub fn evaluate_all(
    rules: &[Rule],
    snapshot: &IndicatorSnapshot,
    thresholds: &RuleThresholds,
    macd_histogram_history: &[Decimal],
) -> bool {
    !rules.is_empty() && rules.iter().all(|r| evaluate(*r, snapshot, thresholds, macd_histogram_history))
}
