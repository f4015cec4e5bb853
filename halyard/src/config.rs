use crate::exit::{ExitConfig, TrailingStopConfig};
use halyard_execution::AdapterConfig;
use halyard_instrument::{Market, Symbol, Timeframe};
use halyard_risk::{CorrelationHeat, KellyCalculator};
use halyard_strategy::{AtrSizing, RuleThresholds, SignalRuleSet, StrategyConfig as PipelineStrategyConfig};
use halyard_ta::IndicatorConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Config-loading failures (SPEC_FULL.md §7 "Fatal: Config missing, credentials missing" —
/// always surfaced before any tick runs, never mid-tick).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("malformed YAML in {path}: {source}")]
    Parse { path: String, #[source] source: serde_yaml::Error },
    #[error("config did not match the expected schema: {0}")]
    Schema(#[source] serde_yaml::Error),
    #[error("unknown run mode {0:?}; expected notify_only, paper or auto")]
    UnknownMode(String),
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read { path: path.display().to_string(), source: e })?;
    serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse { path: path.display().to_string(), source: e })
}

/// Shallow map merge: every key present in `overlay` wins; keys found only in `base` are kept.
/// Nested mappings are not recursively merged — this matches SPEC_FULL.md §6's "shallow map
/// merge, scenario wins key-for-key" wording exactly, rather than a deep merge.
fn merge_shallow(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (k, v) in overlay_map {
                base_map.insert(k, v);
            }
            Value::Mapping(base_map)
        }
        (_, overlay) if !matches!(overlay, Value::Null) => overlay,
        (base, _) => base,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MaConfig {
    pub short: usize,
    pub long: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RsiConfig {
    pub period: usize,
    pub oversold: Decimal,
    pub overbought: Decimal,
    #[serde(default)]
    pub overbought_exit: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MacdConfig {
    pub enabled: bool,
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct VolumeConfig {
    pub surge_ratio: Decimal,
    pub low_ratio: Decimal,
}

/// Indicator parameters a scenario's strategy profile supplies (SPEC_FULL.md §6 `strategy{}`),
/// distinct from `halyard_strategy::StrategyConfig` (rule sets + sizing), which lives under
/// `signals{}`/`risk{}` here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndicatorParamsConfig {
    pub ma: MaConfig,
    pub rsi: RsiConfig,
    pub macd: MacdConfig,
    #[serde(default)]
    pub volume: Option<VolumeConfig>,
}

impl IndicatorParamsConfig {
    pub fn to_ta_config(&self, atr_period: Option<usize>, cvd_window: Option<usize>, volume_avg_period: usize) -> IndicatorConfig {
        IndicatorConfig {
            ema_short: self.ma.short,
            ema_long: self.ma.long,
            rsi_period: self.rsi.period,
            macd: if self.macd.enabled { Some((self.macd.fast, self.macd.slow, self.macd.signal)) } else { None },
            atr_period,
            cvd_window,
            volume_avg_period,
        }
    }

    pub fn to_rule_thresholds(&self) -> RuleThresholds {
        let defaults = RuleThresholds::default();
        RuleThresholds {
            rsi_oversold: self.rsi.oversold,
            rsi_overbought: self.rsi.overbought,
            rsi_overbought_exit: self.rsi.overbought_exit.unwrap_or(defaults.rsi_overbought_exit),
            volume_surge_multiplier: self.volume.as_ref().map(|v| v.surge_ratio).unwrap_or(defaults.volume_surge_multiplier),
            volume_low_multiplier: self.volume.as_ref().map(|v| v.low_ratio).unwrap_or(defaults.volume_low_multiplier),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TrailingStopWire {
    pub enabled: bool,
    pub activation_percent: Decimal,
    pub callback_percent: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TakeProfitStage {
    pub at_percent: Decimal,
    pub close_ratio: Decimal,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct AtrPositionConfig {
    pub enabled: bool,
    pub risk_per_trade_percent: Decimal,
    pub atr_multiplier: Decimal,
    pub max_position_ratio: Decimal,
}

impl AtrPositionConfig {
    pub fn to_atr_sizing(&self) -> Option<AtrSizing> {
        self.enabled.then(|| AtrSizing {
            multiplier: self.atr_multiplier,
            risk_per_trade: self.risk_per_trade_percent,
            max_position_ratio: self.max_position_ratio,
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CorrelationFilterConfig {
    pub enabled: bool,
    pub threshold: Decimal,
    pub lookback: usize,
}

/// `risk{}` block (SPEC_FULL.md §6). `take_profit_stages`/`position_sizing` are accepted for
/// schema fidelity with the distilled spec's enumerated config surface but have no consumer:
/// the Exit Engine's precedence chain (§4.5) only ever fully closes a position, it never stages
/// a partial close, so there is nothing in this repo to wire a staged take-profit into.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RiskConfig {
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
    #[serde(default)]
    pub trailing_stop: Option<TrailingStopWire>,
    pub position_ratio: Decimal,
    pub max_positions: usize,
    pub max_position_per_symbol: Decimal,
    pub max_total_loss_percent: Decimal,
    pub daily_loss_limit_percent: Decimal,
    /// Minimum reward/risk ratio the risk-reward prefilter requires (SPEC_FULL.md §4.4 filters).
    #[serde(default = "default_min_risk_reward")]
    pub min_risk_reward: Decimal,
    #[serde(default)]
    pub break_even_profit: Option<Decimal>,
    #[serde(default)]
    pub break_even_stop: Option<Decimal>,
    #[serde(default)]
    pub minimal_roi: Option<BTreeMap<u32, Decimal>>,
    #[serde(default)]
    pub time_stop_hours: Option<Decimal>,
    #[serde(default)]
    pub take_profit_stages: Option<Vec<TakeProfitStage>>,
    #[serde(default)]
    pub atr_position: Option<AtrPositionConfig>,
    #[serde(default)]
    pub correlation_filter: Option<CorrelationFilterConfig>,
    #[serde(default)]
    pub kelly: Option<KellyCalculator>,
    #[serde(default)]
    pub correlation_heat: Option<CorrelationHeat>,
}

fn default_min_risk_reward() -> Decimal {
    Decimal::new(15, 1) // 1.5
}

impl RiskConfig {
    /// Builds the Signal Pipeline's [`PipelineStrategyConfig`] out of this risk block plus the
    /// indicator thresholds and rule sets that live alongside it in [`RuntimeConfig`].
    pub fn to_pipeline_strategy_config(&self, rules: SignalRuleSet, thresholds: RuleThresholds) -> PipelineStrategyConfig {
        PipelineStrategyConfig {
            rules,
            thresholds,
            min_risk_reward: self.min_risk_reward,
            correlation_filter_threshold: self.correlation_filter.map(|c| c.threshold).unwrap_or(Decimal::ONE),
            kelly: self.kelly,
            atr_sizing: self.atr_position.and_then(|c| c.to_atr_sizing()),
            correlation_heat: self.correlation_heat,
        }
    }

    pub fn to_exit_config(&self) -> ExitConfig {
        ExitConfig {
            stop_loss_percent: self.stop_loss_percent,
            take_profit_percent: self.take_profit_percent,
            trailing_stop: self.trailing_stop.and_then(|w| {
                w.enabled.then_some(TrailingStopConfig { activation_percent: w.activation_percent, callback_percent: w.callback_percent })
            }),
            break_even_profit: self.break_even_profit,
            break_even_stop: self.break_even_stop,
            minimal_roi: self.minimal_roi.clone(),
            time_stop_hours: self.time_stop_hours,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    pub order_type: OrderType,
    pub min_order_usdt: Decimal,
    #[serde(default)]
    pub order_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub max_entry_slippage: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub on_open: bool,
    #[serde(default)]
    pub on_close: bool,
    #[serde(default)]
    pub on_error: bool,
    #[serde(default)]
    pub on_halt: bool,
    pub min_interval_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    NotifyOnly,
    Paper,
    Auto,
}

/// Strategy-profile-level configuration: indicator parameters, the rule sets the Signal
/// Pipeline evaluates, base risk parameters and execution/notification plumbing
/// (SPEC_FULL.md §6, "Base strategy").
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    pub symbols: Vec<Symbol>,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub trend_timeframe: Option<Timeframe>,
    pub strategy: IndicatorParamsConfig,
    pub signals: SignalRuleSet,
    pub risk: RiskConfig,
    pub execution: ExecutionConfig,
    pub notify: NotifyConfig,
    pub mode: RunMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    pub market: Market,
    #[serde(default)]
    pub testnet: bool,
    #[serde(default)]
    pub credentials_path: Option<String>,
}

fn default_true() -> bool {
    true
}

/// One trading scenario (SPEC_FULL.md §6, "Scenarios"). `risk` is a raw partial YAML mapping
/// rather than a full [`RiskConfig`]: a scenario typically overrides one or two risk fields
/// (eg/ `max_positions`), and the three-way merge happens at the `Value` level before the
/// merged document is deserialized into the scenario's effective [`RiskConfig`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub strategy_id: String,
    pub initial_usdt: Decimal,
    pub fee_rate: Decimal,
    pub slippage_percent: Decimal,
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub symbols: Option<Vec<Symbol>>,
    #[serde(default)]
    pub risk: Option<Value>,
}

impl ScenarioConfig {
    pub fn adapter_config(&self, runtime: &RuntimeConfig, risk: &RiskConfig) -> AdapterConfig {
        AdapterConfig {
            fee_rate: self.fee_rate,
            slippage_percent: self.slippage_percent,
            max_positions: risk.max_positions,
            daily_loss_limit_percent: risk.daily_loss_limit_percent,
            min_order_usdt: runtime.execution.min_order_usdt,
            max_entry_slippage: runtime.execution.max_entry_slippage,
        }
    }
}

/// Loaded config for one scenario: the merged `RuntimeConfig` plus that scenario's own identity
/// fields and effective (post-merge) `RiskConfig`.
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    pub runtime: RuntimeConfig,
    pub scenario: ScenarioConfig,
    pub risk: RiskConfig,
}

impl LoadedScenario {
    pub fn pipeline_strategy_config(&self) -> PipelineStrategyConfig {
        self.risk.to_pipeline_strategy_config(self.runtime.signals.clone(), self.runtime.strategy.to_rule_thresholds())
    }
}

/// Loads the layered config for one scenario: global strategy file, optional strategy profile,
/// and the scenario's own document, merged `global -> profile -> scenario` (scenario wins
/// key-for-key) before a single typed `Deserialize` (SPEC_FULL.md §6). Malformed YAML or an
/// unrecognised `mode` is always a fatal, pre-tick error (§7).
pub fn load_scenario(global_path: &Path, profile_path: Option<&Path>, scenario_path: &Path) -> Result<LoadedScenario, ConfigError> {
    let global = read_yaml(global_path)?;
    let profile = match profile_path {
        Some(path) => read_yaml(path)?,
        None => Value::Mapping(Default::default()),
    };
    let scenario_doc = read_yaml(scenario_path)?;

    let merged_runtime_doc = merge_shallow(merge_shallow(global, profile), scenario_doc.clone());
    let runtime: RuntimeConfig = serde_yaml::from_value(merged_runtime_doc).map_err(ConfigError::Schema)?;

    let scenario: ScenarioConfig = serde_yaml::from_value(scenario_doc).map_err(ConfigError::Schema)?;

    let risk = match &scenario.risk {
        Some(override_doc) => {
            let base_risk_doc = serde_yaml::to_value(&runtime.risk).map_err(ConfigError::Schema)?;
            let merged = merge_shallow(base_risk_doc, override_doc.clone());
            serde_yaml::from_value(merged).map_err(ConfigError::Schema)?
        }
        None => runtime.risk.clone(),
    };

    Ok(LoadedScenario { runtime, scenario, risk })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global_yaml() -> &'static str {
        r#"
symbols: [BTCUSDT, ETHUSDT]
timeframe: "1h"
strategy:
  ma: { short: 9, long: 21 }
  rsi: { period: 14, oversold: 30, overbought: 70 }
  macd: { enabled: true, fast: 12, slow: 26, signal: 9 }
signals:
  buy: [ma_golden_cross]
  sell: [ma_death_cross]
risk:
  stop_loss_percent: 0.02
  take_profit_percent: 0.04
  position_ratio: 0.1
  max_positions: 3
  max_position_per_symbol: 0.3
  max_total_loss_percent: 0.2
  daily_loss_limit_percent: 0.05
execution:
  order_type: market
  min_order_usdt: 10
notify:
  min_interval_minutes: 15
mode: paper
"#
    }

    fn scenario_yaml(risk_override: &str) -> String {
        format!(
            r#"
id: scenario-a
name: "Scenario A"
strategy_id: default
initial_usdt: 1000
fee_rate: 0.001
slippage_percent: 0.001
exchange:
  market: futures
{risk_override}
"#
        )
    }

    #[test]
    fn scenario_without_risk_override_inherits_runtime_risk() {
        let dir = tempfile::tempdir().unwrap();
        let global_path = dir.path().join("global.yaml");
        let scenario_path = dir.path().join("scenario.yaml");
        std::fs::write(&global_path, global_yaml()).unwrap();
        std::fs::write(&scenario_path, scenario_yaml("")).unwrap();

        let loaded = load_scenario(&global_path, None, &scenario_path).unwrap();
        assert_eq!(loaded.risk.max_positions, 3);
        assert_eq!(loaded.runtime.mode, RunMode::Paper);
    }

    #[test]
    fn scenario_risk_override_wins_over_global() {
        let dir = tempfile::tempdir().unwrap();
        let global_path = dir.path().join("global.yaml");
        let scenario_path = dir.path().join("scenario.yaml");
        std::fs::write(&global_path, global_yaml()).unwrap();
        std::fs::write(&scenario_path, scenario_yaml("risk:\n  max_positions: 5\n")).unwrap();

        let loaded = load_scenario(&global_path, None, &scenario_path).unwrap();
        assert_eq!(loaded.risk.max_positions, 5);
        // Fields the override didn't mention are inherited from the merged runtime risk block.
        assert_eq!(loaded.risk.stop_loss_percent, rust_decimal_macros::dec!(0.02));
    }

    #[test]
    fn strategy_profile_overrides_global_and_is_overridden_by_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let global_path = dir.path().join("global.yaml");
        let profile_path = dir.path().join("profile.yaml");
        let scenario_path = dir.path().join("scenario.yaml");
        std::fs::write(&global_path, global_yaml()).unwrap();
        std::fs::write(
            &profile_path,
            r#"
risk:
  stop_loss_percent: 0.015
  take_profit_percent: 0.04
  position_ratio: 0.1
  max_positions: 4
  max_position_per_symbol: 0.3
  max_total_loss_percent: 0.2
  daily_loss_limit_percent: 0.05
"#,
        )
        .unwrap();
        std::fs::write(&scenario_path, scenario_yaml("")).unwrap();

        let loaded = load_scenario(&global_path, Some(&profile_path), &scenario_path).unwrap();
        assert_eq!(loaded.runtime.risk.max_positions, 4);
    }

    #[test]
    fn malformed_yaml_is_a_config_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let global_path = dir.path().join("global.yaml");
        let scenario_path = dir.path().join("scenario.yaml");
        std::fs::write(&global_path, "not: [valid").unwrap();
        std::fs::write(&scenario_path, scenario_yaml("")).unwrap();

        assert!(load_scenario(&global_path, None, &scenario_path).is_err());
    }
}
