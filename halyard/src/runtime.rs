use crate::config::LoadedScenario;
use crate::error::EngineError;
use crate::exit::{self, ExitOutcome};
use crate::{data::DataProvider, portfolio};
use chrono::{DateTime, Timelike, Utc};
use halyard_execution::{ExchangeClient, ExecutionAdapter, OrderStateEvent, OrderStateMachine};
use halyard_instrument::{Account, Kline, Side, SignalHistoryRecord, SignalHistoryStatus, SignalType, Symbol};
use halyard_risk::{log_returns, TradeOutcome};
use halyard_store::{AccountStore, CacheFile, EquityHistory, HeartbeatStore, ScenarioStateStore};
use halyard_strategy::{
    gate, rule, sentiment, sizing, Context, RuleFires, SentimentDecision, SentimentReading, SizingContext, Strategy,
};
use halyard_ta::IndicatorSnapshot;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// K-lines fetched per tick, comfortably above every indicator's warmup requirement.
const KLINE_LIMIT: usize = 200;
const TREND_KLINE_LIMIT: usize = 60;
/// MACD histogram samples kept per symbol for [`rule::evaluate`]'s shrinking-histogram rules.
const MACD_HISTORY_LEN: usize = 5;
/// TTL for the external sentiment reading (SPEC_FULL.md §4.10).
const SENTIMENT_CACHE_TTL_MINUTES: i64 = 15;
/// ATR/CVD/volume-average windows the indicator snapshot is built with. Not part of the
/// scenario's YAML schema (SPEC_FULL.md §6 `strategy{}` only exposes MA/RSI/MACD/volume-ratio
/// knobs), so these follow the standard ATR(14) convention rather than a configured value.
const ATR_PERIOD: usize = 14;
const CVD_WINDOW: usize = 20;
const VOLUME_AVG_PERIOD: usize = 20;

/// Outcome of one [`ScenarioRuntime::run_tick`] call, returned for logging/CLI reporting.
#[derive(Debug, Default, Clone)]
pub struct TickSummary {
    pub opened: usize,
    pub closed: usize,
    pub skipped_symbols: Vec<Symbol>,
    pub paused: bool,
    pub halted: bool,
}

fn signal_id(symbol: &Symbol, entry_time: DateTime<Utc>) -> String {
    format!("{symbol}-{}", entry_time.timestamp_nanos_opt().unwrap_or_default())
}

fn exit_reason(outcome: ExitOutcome) -> &'static str {
    match outcome {
        ExitOutcome::None => "none",
        ExitOutcome::StopLoss => "stop_loss",
        ExitOutcome::TakeProfit => "take_profit",
        ExitOutcome::TrailingStop => "trailing_stop",
        ExitOutcome::RoiTakeProfit => "roi_take_profit",
        ExitOutcome::TimeStop => "time_stop",
    }
}

/// Runs one scenario's tick loop end to end (SPEC_FULL.md §4.1-§4.6): refresh data, evaluate the
/// Exit Engine for held positions, run the Signal Pipeline for everything else, reconcile
/// in-flight orders, then persist account/state/heartbeat.
///
/// Every store this holds is scoped to one scenario's data directory; nothing here is shared
/// across scenarios, so the [`crate::scheduler::Scheduler`] is free to tick every scenario
/// concurrently.
pub struct ScenarioRuntime {
    loaded: LoadedScenario,
    client: Arc<dyn ExchangeClient>,
    adapter: Arc<dyn ExecutionAdapter>,
    order_state: OrderStateMachine,
    data: DataProvider,
    account_store: AccountStore,
    state_store: ScenarioStateStore,
    equity_history: EquityHistory,
    signal_history: halyard_store::SignalHistoryStore,
    heartbeat_store: HeartbeatStore,
    sentiment_cache: CacheFile<SentimentReading>,
    kill_switch_path: PathBuf,
    emergency_halt_path: PathBuf,
    strategy: Option<Arc<dyn Strategy>>,
    macd_histogram: HashMap<Symbol, VecDeque<Decimal>>,
}

impl ScenarioRuntime {
    pub fn new(
        loaded: LoadedScenario,
        client: Arc<dyn ExchangeClient>,
        adapter: Arc<dyn ExecutionAdapter>,
        data_dir: impl AsRef<Path>,
        strategy: Option<Arc<dyn Strategy>>,
    ) -> Self {
        let data_dir = data_dir.as_ref();
        let scenario_id = loaded.scenario.id.clone();
        Self {
            loaded,
            data: DataProvider::new(client.clone()),
            client,
            adapter,
            order_state: OrderStateMachine::new(),
            account_store: AccountStore::new(data_dir),
            state_store: ScenarioStateStore::new(data_dir),
            equity_history: EquityHistory::new(data_dir, &scenario_id),
            signal_history: halyard_store::SignalHistoryStore::new(data_dir),
            heartbeat_store: HeartbeatStore::new(data_dir),
            sentiment_cache: CacheFile::new(
                data_dir.join("sentiment-cache.json"),
                chrono::Duration::minutes(SENTIMENT_CACHE_TTL_MINUTES),
            ),
            kill_switch_path: data_dir.join("kill-switch.flag"),
            emergency_halt_path: data_dir.join("emergency-halt.json"),
            strategy,
            macd_histogram: HashMap::new(),
        }
    }

    fn scenario_id(&self) -> &str {
        &self.loaded.scenario.id
    }

    /// Runs one full tick. Errors returned here are the ones [`crate::scheduler::Scheduler`]
    /// catches and logs per scenario without affecting siblings (SPEC_FULL.md §4.1, §5).
    pub async fn run_tick(&mut self, now: DateTime<Utc>) -> Result<TickSummary, EngineError> {
        let tick_started = Utc::now();
        let mut summary = TickSummary::default();

        let mut state = self.state_store.load(self.scenario_id()).await;
        if state.paused {
            summary.paused = true;
            self.write_heartbeat(tick_started).await?;
            return Ok(summary);
        }

        let kill_switch = halyard_store::is_present(&self.kill_switch_path).await;
        let emergency_halt = kill_switch || halyard_store::is_present(&self.emergency_halt_path).await;
        if kill_switch {
            summary.halted = true;
        }

        let mut account = self
            .account_store
            .load_account(self.scenario_id(), self.loaded.scenario.initial_usdt, now)
            .await?;
        self.account_store.reset_daily_loss_if_needed(&mut account, now.date_naive());

        let symbols = self.loaded.scenario.symbols.clone().unwrap_or_else(|| self.loaded.runtime.symbols.clone());
        let timeframe = self.loaded.runtime.timeframe.clone();
        let refresh = self.data.refresh(&symbols, &timeframe, KLINE_LIMIT).await;
        summary.skipped_symbols = refresh.failed.clone();

        let trend_snapshot = match &self.loaded.runtime.trend_timeframe {
            Some(trend_timeframe) => {
                let trend_refresh = self.data.refresh(&symbols, trend_timeframe, TREND_KLINE_LIMIT).await;
                let ta_cfg = self.loaded.runtime.strategy.to_ta_config(None, None, VOLUME_AVG_PERIOD);
                trend_refresh
                    .klines
                    .values()
                    .find_map(|klines| halyard_ta::compute(klines, &ta_cfg))
            }
            None => None,
        };
        let higher_timeframe_trend = trend_snapshot
            .map(|snapshot| {
                if snapshot.ema_short.current > snapshot.ema_long.current {
                    halyard_strategy::TrendDirection::Bullish
                } else if snapshot.ema_short.current < snapshot.ema_long.current {
                    halyard_strategy::TrendDirection::Bearish
                } else {
                    halyard_strategy::TrendDirection::Neutral
                }
            })
            .unwrap_or(halyard_strategy::TrendDirection::Neutral);

        let sentiment_reading = self.sentiment_cache.read(now).await.fresh();

        let prices: HashMap<Symbol, Decimal> =
            refresh.klines.iter().filter_map(|(symbol, klines)| klines.last().map(|k| (symbol.clone(), k.close_only()))).collect();

        // Signal Pipeline runs before the Exit Engine (SPEC_FULL.md §4.1(c), §5 "open-before-exit
        // within a tick is the intentional order"): a position opened this tick must still be
        // exit-evaluated this same tick, not deferred to the next one.
        let held_returns = Self::held_returns(&account, &refresh.klines);
        if !kill_switch {
            let (opened, closed) = self
                .run_signal_pipeline(
                    &mut account,
                    &mut state,
                    &symbols,
                    &refresh.klines,
                    &held_returns,
                    higher_timeframe_trend,
                    sentiment_reading,
                    emergency_halt,
                    &prices,
                    now,
                )
                .await?;
            summary.opened += opened;
            summary.closed += closed;
        }

        // Recomputed so the Exit Engine's context reflects any positions the Signal Pipeline
        // just opened, not the pre-tick snapshot.
        let held_returns = Self::held_returns(&account, &refresh.klines);
        summary.closed += self.run_exit_engine(&mut account, &refresh.klines, &held_returns, &higher_timeframe_trend, emergency_halt, now).await?;

        // Order-timeout reconciliation runs last (SPEC_FULL.md §4.1(d)): it only ever concerns
        // orders left open from a previous tick, so it cannot race this tick's own opens/closes.
        let timeout_events = self.order_state.check_timeouts(&mut account, &*self.client, now).await?;
        self.handle_order_events(&mut account, &timeout_events, now).await?;
        self.order_state.sync_exchange_stop_losses(&mut account, &*self.client, now).await?;

        let equity = self.account_store.calc_total_equity(&account, &prices);
        if self.loaded.scenario.initial_usdt > Decimal::ZERO {
            let drawdown = (self.loaded.scenario.initial_usdt - equity) / self.loaded.scenario.initial_usdt;
            if drawdown >= self.loaded.risk.max_total_loss_percent {
                warn!(scenario = self.scenario_id(), %drawdown, "max total loss breached, pausing scenario");
                state.paused = true;
                summary.paused = true;
            }
        }

        self.account_store.save_account(self.scenario_id(), &account).await?;
        self.state_store.save(self.scenario_id(), &state).await?;
        if now.minute() == 0 {
            self.equity_history
                .append(halyard_store::EquitySample { timestamp: now, equity })
                .await?;
        }
        self.write_heartbeat(tick_started).await?;

        let exposure = portfolio::summarize(&account, &prices);
        for symbol in portfolio::symbols_over_limit(&exposure, self.loaded.risk.max_position_per_symbol) {
            warn!(scenario = self.scenario_id(), %symbol, "position over per-symbol exposure limit");
        }

        Ok(summary)
    }

    async fn write_heartbeat(&self, tick_started: DateTime<Utc>) -> Result<(), EngineError> {
        let duration = Utc::now() - tick_started;
        self.heartbeat_store.write_heartbeat(self.scenario_id(), tick_started, duration).await?;
        Ok(())
    }

    async fn handle_order_events(
        &self,
        account: &mut Account,
        events: &[OrderStateEvent],
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        for event in events {
            match event {
                OrderStateEvent::PartialFill { order_id, filled_qty, requested_qty } => {
                    warn!(scenario = self.scenario_id(), order_id, %filled_qty, %requested_qty, "order partially filled");
                }
                OrderStateEvent::ForceExitRequired { symbol, order_id } => {
                    warn!(scenario = self.scenario_id(), %symbol, order_id, "exit order timed out repeatedly, forcing market exit");
                    let price = account.positions.get(symbol).map(|p| p.entry_price).unwrap_or_default();
                    let cfg = self.loaded.scenario.adapter_config(&self.loaded.runtime, &self.loaded.risk);
                    self.adapter.force_exit(account, symbol, price, "forced_exit_timeout", &cfg, now).await?;
                }
            }
        }
        Ok(())
    }

    /// Log-return series per held symbol, used by the correlation filter and the correlation-heat
    /// sizing overlay. Symbols without fresh klines this tick are dropped rather than scored on
    /// stale data.
    fn held_returns(account: &Account, klines: &HashMap<Symbol, Vec<Kline>>) -> Vec<(Symbol, Vec<Decimal>)> {
        account
            .positions
            .keys()
            .filter_map(|symbol| {
                let closes: Vec<Decimal> = klines.get(symbol)?.iter().map(Kline::close_only).collect();
                Some((symbol.clone(), log_returns(&closes)))
            })
            .collect()
    }

    fn build_context(
        &self,
        held_returns: &[(Symbol, Vec<Decimal>)],
        higher_timeframe_trend: halyard_strategy::TrendDirection,
        sentiment_reading: Option<SentimentReading>,
        emergency_halt: bool,
    ) -> Context {
        Context {
            higher_timeframe_trend,
            held_symbols: held_returns.to_vec(),
            emergency_halt,
            event_phase: None,
            sentiment: sentiment_reading,
            min_risk_reward: self.loaded.risk.min_risk_reward,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_exit_engine(
        &mut self,
        account: &mut Account,
        klines: &HashMap<Symbol, Vec<Kline>>,
        held_returns: &[(Symbol, Vec<Decimal>)],
        higher_timeframe_trend: &halyard_strategy::TrendDirection,
        emergency_halt: bool,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        let exit_cfg = self.loaded.risk.to_exit_config();
        let cfg = self.loaded.scenario.adapter_config(&self.loaded.runtime, &self.loaded.risk);
        let mut closed = 0;

        let held_symbols: Vec<Symbol> = account.positions.keys().cloned().collect();
        for symbol in held_symbols {
            let Some(kline) = klines.get(&symbol).and_then(|ks| ks.last()) else { continue };
            let price = kline.close_only();

            let ctx = self.build_context(held_returns, *higher_timeframe_trend, None, emergency_halt);
            let position_snapshot = match account.positions.get(&symbol) {
                Some(position) => position.clone(),
                None => continue,
            };
            let custom_stop_loss =
                self.strategy.as_ref().and_then(|s| s.custom_stop_loss(&position_snapshot, &ctx));
            let confirm_exit = self.strategy.as_ref().map(|s| s.confirm_exit(&position_snapshot, &ctx)).unwrap_or(true);
            let strategy_exit_reason = self.strategy.as_ref().and_then(|s| s.should_exit(&position_snapshot, kline, &ctx));

            let Some(position) = account.positions.get_mut(&symbol) else { continue };
            let outcome = exit::evaluate(position, price, kline, true, &exit_cfg, now, custom_stop_loss);

            let reason = match (&strategy_exit_reason, outcome.is_exit() && confirm_exit) {
                (Some(_), _) => strategy_exit_reason.as_deref(),
                (None, true) => Some(exit_reason(outcome)),
                (None, false) => None,
            };
            let Some(reason) = reason else { continue };

            let side = position.side;
            let entry_time = position.entry_time;
            let trade = match side {
                Side::Long => self.adapter.close_long(account, &symbol, price, reason, &cfg, now).await?,
                Side::Short => self.adapter.close_short(account, &symbol, price, reason, &cfg, now).await?,
            };
            let Some(trade) = trade else { continue };
            closed += 1;
            info!(scenario = self.scenario_id(), %symbol, reason, pnl = ?trade.pnl, "position closed");

            if let Some(strategy) = &self.strategy {
                strategy.on_trade_closed(&position_snapshot, trade.pnl.unwrap_or_default());
            }

            let id = signal_id(&symbol, entry_time);
            let _ = self
                .signal_history
                .patch(&id, |record: &mut SignalHistoryRecord| {
                    record.status = SignalHistoryStatus::Closed;
                    record.exit_price = Some(trade.price);
                    record.exit_time = Some(now);
                    record.exit_reason = Some(reason.to_string());
                    record.pnl = trade.pnl;
                    record.pnl_percent = trade.pnl_percent;
                    record.holding_hours = Some((now - entry_time).num_seconds() as f64 / 3600.0);
                })
                .await?;
        }
        Ok(closed)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_signal_pipeline(
        &mut self,
        account: &mut Account,
        state: &mut halyard_store::ScenarioState,
        symbols: &[Symbol],
        klines: &HashMap<Symbol, Vec<Kline>>,
        held_returns: &[(Symbol, Vec<Decimal>)],
        higher_timeframe_trend: halyard_strategy::TrendDirection,
        sentiment_reading: Option<SentimentReading>,
        emergency_halt: bool,
        prices: &HashMap<Symbol, Decimal>,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize), EngineError> {
        let strategy_cfg = self.loaded.pipeline_strategy_config();
        let market = self.loaded.scenario.exchange.market;
        let cfg = self.loaded.scenario.adapter_config(&self.loaded.runtime, &self.loaded.risk);
        let mut opened = 0;
        let mut closed = 0;

        for symbol in symbols {
            // Held symbols are still run through the pipeline (SPEC_FULL.md §4.4 item 2): the gate
            // only ever reaches sell/cover for them, so the position cap below applies to opens only.
            let held_side = account.positions.get(symbol).map(|p| p.side);
            if held_side.is_none() && account.positions.len() >= self.loaded.risk.max_positions {
                continue;
            }
            let Some(symbol_klines) = klines.get(symbol) else { continue };
            let ta_cfg =
                self.loaded.runtime.strategy.to_ta_config(Some(ATR_PERIOD), Some(CVD_WINDOW), VOLUME_AVG_PERIOD);
            let Some(snapshot) = halyard_ta::compute(symbol_klines, &ta_cfg) else { continue };
            self.push_macd_history(symbol, &snapshot);

            let history = self.macd_histogram.get(symbol).map(|d| d.iter().copied().collect::<Vec<_>>()).unwrap_or_default();
            let fires = RuleFires {
                buy: rule::evaluate_all(&strategy_cfg.rules.buy, &snapshot, &strategy_cfg.thresholds, &history),
                sell: rule::evaluate_all(&strategy_cfg.rules.sell, &snapshot, &strategy_cfg.thresholds, &history),
                short: rule::evaluate_all(&strategy_cfg.rules.short, &snapshot, &strategy_cfg.thresholds, &history),
                cover: rule::evaluate_all(&strategy_cfg.rules.cover, &snapshot, &strategy_cfg.thresholds, &history),
            };
            let signal_type = gate::gate(fires, held_side, market);
            if signal_type == SignalType::None {
                continue;
            }

            let price = symbol_klines.last().map(Kline::close_only).unwrap_or_default();

            if signal_type.closes_position() {
                let Some(position) = account.positions.get(symbol) else { continue };
                let entry_time = position.entry_time;
                let reason = if signal_type == SignalType::Sell { "signal_sell" } else { "signal_cover" };
                let trade = match held_side {
                    Some(Side::Long) => self.adapter.close_long(account, symbol, price, reason, &cfg, now).await?,
                    Some(Side::Short) => self.adapter.close_short(account, symbol, price, reason, &cfg, now).await?,
                    None => None,
                };
                let Some(trade) = trade else { continue };
                closed += 1;
                info!(scenario = self.scenario_id(), %symbol, ?signal_type, reason, pnl = ?trade.pnl, "position closed by rule gate");

                let id = signal_id(symbol, entry_time);
                let _ = self
                    .signal_history
                    .patch(&id, |record: &mut SignalHistoryRecord| {
                        record.status = SignalHistoryStatus::Closed;
                        record.exit_price = Some(trade.price);
                        record.exit_time = Some(now);
                        record.exit_reason = Some(reason.to_string());
                        record.pnl = trade.pnl;
                        record.pnl_percent = trade.pnl_percent;
                        record.holding_hours = Some((now - entry_time).num_seconds() as f64 / 3600.0);
                    })
                    .await?;
                continue;
            }

            // Gate only ever reaches buy/short for a symbol with no position, so this branch is the
            // open path; held_side is always None here.
            let candidate_returns = {
                let closes: Vec<Decimal> = symbol_klines.iter().map(Kline::close_only).collect();
                (symbol.clone(), log_returns(&closes))
            };

            let ctx = self.build_context(held_returns, higher_timeframe_trend, sentiment_reading, emergency_halt);
            let regime = halyard_strategy::detect_regime(&snapshot, None);
            let overrides = regime.overrides(self.loaded.risk.stop_loss_percent, self.loaded.risk.take_profit_percent);
            let (stop_loss, take_profit) = match signal_type {
                SignalType::Buy => (price * (Decimal::ONE - overrides.stop_loss_percent), price * (Decimal::ONE + overrides.take_profit_percent)),
                SignalType::Short => (price * (Decimal::ONE + overrides.stop_loss_percent), price * (Decimal::ONE - overrides.take_profit_percent)),
                _ => continue,
            };

            let (reject_reason, scale) = halyard_strategy::filter::run_filters([
                halyard_strategy::filter::multi_timeframe_trend(signal_type, &ctx),
                halyard_strategy::filter::risk_reward_prefilter(signal_type, price, stop_loss, take_profit, &ctx),
                halyard_strategy::filter::correlation_filter(signal_type, &candidate_returns, strategy_cfg.correlation_filter_threshold, &ctx),
                halyard_strategy::filter::emergency_halt(signal_type, &ctx),
                halyard_strategy::filter::event_window(signal_type, &ctx, Decimal::new(5, 1)),
            ]);

            self.consume_notification_window(state, symbol, signal_type, now);

            if let Some(reason) = reject_reason {
                info!(scenario = self.scenario_id(), %symbol, ?signal_type, reason, "signal rejected by filters");
                continue;
            }

            let sentiment_decision = sentiment::evaluate(signal_type, sentiment_reading.as_ref());
            let sentiment_scale = match sentiment_decision {
                SentimentDecision::Execute => Decimal::ONE,
                SentimentDecision::Reduce => Decimal::new(5, 1),
                SentimentDecision::Warn(reason) => {
                    warn!(scenario = self.scenario_id(), %symbol, reason, "sentiment warning, executing anyway");
                    Decimal::ONE
                }
                SentimentDecision::Skip(reason) => {
                    info!(scenario = self.scenario_id(), %symbol, reason, "signal skipped on sentiment");
                    continue;
                }
            };

            let side = if signal_type == SignalType::Short { Side::Short } else { Side::Long };
            let mut ratio = self.loaded.risk.position_ratio * overrides.position_ratio_multiplier * scale * sentiment_scale;
            if let Some(strategy) = &self.strategy {
                ratio = strategy.adjust_position(ratio, side, &ctx);
            }

            let equity = self.account_store.calc_total_equity(account, prices);
            let closed_outcomes: Vec<TradeOutcome> = account
                .trades
                .iter()
                .filter_map(|t| t.pnl.map(|pnl| TradeOutcome { won: pnl > Decimal::ZERO, return_fraction: t.pnl_percent.unwrap_or_default() }))
                .collect();
            let sizing_ctx = SizingContext {
                kelly: strategy_cfg.kelly.as_ref(),
                closed_outcomes: &closed_outcomes,
                atr_sizing: strategy_cfg.atr_sizing.as_ref(),
                atr: snapshot.atr,
                correlation_heat: strategy_cfg.correlation_heat.as_ref(),
                held_symbols: held_returns,
            };
            let final_ratio = sizing::position_ratio(ratio, equity, price, &candidate_returns, &sizing_ctx);
            if final_ratio <= Decimal::ZERO || price <= Decimal::ZERO {
                continue;
            }
            let quantity = (equity * final_ratio) / price;
            if quantity <= Decimal::ZERO {
                continue;
            }

            let trade = match signal_type {
                SignalType::Buy => self.adapter.open_long(account, symbol, price, quantity, stop_loss, take_profit, &cfg, now).await?,
                SignalType::Short => self.adapter.open_short(account, symbol, price, quantity, stop_loss, take_profit, &cfg, now).await?,
                _ => None,
            };
            let Some(trade) = trade else { continue };
            opened += 1;
            info!(scenario = self.scenario_id(), %symbol, ?signal_type, %quantity, %price, "position opened");

            let record = SignalHistoryRecord {
                id: signal_id(symbol, now),
                symbol: symbol.clone(),
                signal_type,
                entry_price: trade.price,
                entry_time: now,
                entry_conditions: serde_json::json!({
                    "signal": format!("{signal_type:?}"),
                    "regime": format!("{regime:?}"),
                    "scale": scale.to_string(),
                }),
                status: SignalHistoryStatus::Open,
                exit_price: None,
                exit_time: None,
                exit_reason: None,
                pnl: None,
                pnl_percent: None,
                holding_hours: None,
            };
            self.signal_history.append(&record).await?;
        }
        Ok((opened, closed))
    }

    /// Dedups notification dispatch per (symbol, signal type): the window is consumed whether or
    /// not downstream filters ultimately reject the signal, so a filtered signal cannot reset the
    /// cooldown for a later, genuinely actionable one (SPEC_FULL.md §6 `notify.min_interval_minutes`).
    fn consume_notification_window(&self, state: &mut halyard_store::ScenarioState, symbol: &Symbol, signal_type: SignalType, now: DateTime<Utc>) {
        let window = chrono::Duration::minutes(self.loaded.runtime.notify.min_interval_minutes);
        let in_cooldown = state
            .last_signals
            .get(symbol)
            .is_some_and(|last| last.signal_type == signal_type && now - last.timestamp < window);
        if !in_cooldown {
            state.last_signals.insert(symbol.clone(), halyard_store::LastSignal { signal_type, timestamp: now });
        }
    }

    fn push_macd_history(&mut self, symbol: &Symbol, snapshot: &IndicatorSnapshot) {
        let Some(macd) = &snapshot.macd else { return };
        let history = self.macd_histogram.entry(symbol.clone()).or_default();
        history.push_back(macd.current.histogram);
        while history.len() > MACD_HISTORY_LEN {
            history.pop_front();
        }
    }
}
