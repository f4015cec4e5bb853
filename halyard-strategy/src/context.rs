use halyard_instrument::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Higher-timeframe trend direction used by the multi-timeframe trend filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

/// Phase of a scheduled macro event (eg/ an FOMC print) relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Pre,
    During,
    Post,
}

/// Fear & Greed style sentiment reading plus the pieces the sentiment gate needs.
///
/// Serializable so it can round-trip through [`halyard_store::CacheFile`] as the TTL-gated
/// `sentiment-cache.json` a scenario's signal pipeline reads from (SPEC_FULL.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SentimentReading {
    pub fear_greed_index: Decimal,
    pub fear_greed_delta: Decimal,
    pub keyword_score: Decimal,
    pub important_news_count: u32,
}

/// Everything external to the Indicator Snapshot the Signal Pipeline's filters, sentiment gate
/// and sizing stage need for one `(symbol, tick)` evaluation.
#[derive(Debug, Clone)]
pub struct Context {
    pub higher_timeframe_trend: TrendDirection,
    /// `(symbol, log_returns)` for every symbol currently held, used by the correlation filter
    /// and the portfolio correlation-heat scaler.
    pub held_symbols: Vec<(Symbol, Vec<Decimal>)>,
    pub emergency_halt: bool,
    pub event_phase: Option<EventPhase>,
    pub sentiment: Option<SentimentReading>,
    pub min_risk_reward: Decimal,
}
