use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction a [`Signal`] asks the Execution Adapter to act on. `None` is the absorbing
/// element produced when no rule combination fires for the current position state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Buy,
    Sell,
    Short,
    Cover,
    None,
}

impl SignalType {
    pub fn opens_position(&self) -> bool {
        matches!(self, SignalType::Buy | SignalType::Short)
    }

    pub fn closes_position(&self) -> bool {
        matches!(self, SignalType::Sell | SignalType::Cover)
    }
}

/// Output of the Signal Pipeline for one `(symbol, tick)` pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Signal {
    pub symbol: Symbol,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub price: Decimal,
    pub reason: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn none(symbol: Symbol, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol,
            signal_type: SignalType::None,
            price,
            reason: Vec::new(),
            timestamp,
        }
    }
}

/// Lifecycle status of a [`SignalHistoryRecord`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalHistoryStatus {
    Open,
    Closed,
    Expired,
}

/// Append-only analysis record: written once when a position opens, patched in place (via the
/// JSONL+index scheme in `halyard-store`) when it closes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SignalHistoryRecord {
    pub id: String,
    pub symbol: Symbol,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    /// Serialized indicator snapshot + triggered rule ids at entry time.
    pub entry_conditions: serde_json::Value,
    pub status: SignalHistoryStatus,
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_reason: Option<String>,
    pub pnl: Option<Decimal>,
    pub pnl_percent: Option<Decimal>,
    pub holding_hours: Option<f64>,
}

/// Rolling per-symbol cumulative volume delta (buyer-initiated minus seller-initiated),
/// produced by an optional streaming consumer and read through a TTL-gated cache.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct CvdEntry {
    pub cvd: Decimal,
    pub buy_volume: Decimal,
    pub sell_volume: Decimal,
    pub trade_count: u64,
    pub window_start_ms: i64,
    pub updated_at: DateTime<Utc>,
}
