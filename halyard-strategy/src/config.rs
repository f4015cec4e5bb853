use crate::rule::{Rule, RuleThresholds};
use crate::sizing::AtrSizing;
use halyard_risk::{CorrelationHeat, KellyCalculator};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The named rule combinations a strategy evaluates for each of the four directional signal
/// types. Absent a `short`/`cover` entry, the market's short-support gate (SPEC_FULL Open
/// Question 4) makes this moot on spot anyway.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignalRuleSet {
    #[serde(default)]
    pub buy: Vec<Rule>,
    #[serde(default)]
    pub sell: Vec<Rule>,
    #[serde(default)]
    pub short: Vec<Rule>,
    #[serde(default)]
    pub cover: Vec<Rule>,
}

/// Top-level per-scenario strategy configuration: rule sets, thresholds and the optional sizing
/// overlays, deserialized from the `strategy` section of a scenario's YAML document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    pub rules: SignalRuleSet,
    #[serde(default)]
    pub thresholds: RuleThresholds,
    pub min_risk_reward: Decimal,
    pub correlation_filter_threshold: Decimal,
    pub kelly: Option<KellyCalculator>,
    pub atr_sizing: Option<AtrSizing>,
    pub correlation_heat: Option<CorrelationHeat>,
}
