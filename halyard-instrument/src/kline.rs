use crate::error::InstrumentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single immutable candlestick.
///
/// Invariant (enforced by [`Kline::new`]): `low <= min(open, close) <= max(open, close) <= high`
/// and `open_time < close_time`. Once constructed a [`Kline`] is never mutated — the Indicator
/// Engine only ever reads suffixes of a `&[Kline]` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: DateTime<Utc>,
}

impl Kline {
    pub fn new(
        open_time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        close_time: DateTime<Utc>,
    ) -> Result<Self, InstrumentError> {
        let body_low = open.min(close);
        let body_high = open.max(close);
        if low > body_low || body_high > high {
            return Err(InstrumentError::InvalidKline(format!(
                "high/low out of range: low={low} body=({body_low},{body_high}) high={high}"
            )));
        }
        if open_time >= close_time {
            return Err(InstrumentError::InvalidKline(format!(
                "open_time {open_time} >= close_time {close_time}"
            )));
        }
        Ok(Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        })
    }

    /// The extreme used for intracandle exit evaluation: `high` for a long's take-profit / a
    /// short's stop-loss check, `low` for the opposite. Callers pick the field directly; this
    /// exists only to make the close-mode fallback (SPEC_FULL.md §4.5) explicit at call sites.
    pub fn close_only(&self) -> Decimal {
        self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(mins: i64) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH + chrono::Duration::minutes(mins)
    }

    #[test]
    fn rejects_high_below_body() {
        let err = Kline::new(t(0), dec!(10), dec!(9), dec!(8), dec!(9.5), dec!(1), t(1));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_open_time_after_close_time() {
        let err = Kline::new(t(5), dec!(10), dec!(11), dec!(9), dec!(10), dec!(1), t(1));
        assert!(err.is_err());
    }

    #[test]
    fn accepts_well_formed_candle() {
        let k = Kline::new(t(0), dec!(10), dec!(11), dec!(9), dec!(10.5), dec!(100), t(1)).unwrap();
        assert_eq!(k.high, dec!(11));
    }
}
