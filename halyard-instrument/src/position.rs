use crate::{error::InstrumentError, symbol::Symbol, Side};
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trailing-stop state attached to a [`Position`] once activated.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Trailing {
    pub active: bool,
    /// Highest price seen since entry for a long, lowest for a short.
    pub peak: Decimal,
    pub stop_price: Decimal,
}

/// A single open position, owned by exactly one [`crate::Account`].
///
/// Invariants (SPEC_FULL.md §3):
/// * long: `stop_loss < entry_price < take_profit`, `trailing.peak >= entry_price` when active.
/// * short: `take_profit < entry_price < stop_loss`, `trailing.peak <= entry_price` when active.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub symbol: Symbol,
    #[serde(default)]
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub trailing: Option<Trailing>,
    /// Margin locked against a short position; `None` for longs.
    pub margin_usdt: Option<Decimal>,
    pub exchange_sl_order_id: Option<String>,
    pub exchange_sl_price: Option<Decimal>,
    pub entry_order_id: Option<String>,
    pub take_profit_order_id: Option<String>,
    #[serde(default)]
    pub exit_timeout_count: u32,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn open_long(
        symbol: Symbol,
        quantity: Decimal,
        entry_price: Decimal,
        entry_time: DateTime<Utc>,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> Result<Self, InstrumentError> {
        if !(stop_loss < entry_price && entry_price < take_profit) {
            return Err(InstrumentError::InvalidPosition(format!(
                "long requires stop_loss < entry_price < take_profit, got {stop_loss} < {entry_price} < {take_profit}"
            )));
        }
        Ok(Self {
            symbol,
            side: Side::Long,
            quantity,
            entry_price,
            entry_time,
            stop_loss,
            take_profit,
            trailing: None,
            margin_usdt: None,
            exchange_sl_order_id: None,
            exchange_sl_price: None,
            entry_order_id: None,
            take_profit_order_id: None,
            exit_timeout_count: 0,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn open_short(
        symbol: Symbol,
        quantity: Decimal,
        entry_price: Decimal,
        entry_time: DateTime<Utc>,
        stop_loss: Decimal,
        take_profit: Decimal,
        margin_usdt: Decimal,
    ) -> Result<Self, InstrumentError> {
        if !(take_profit < entry_price && entry_price < stop_loss) {
            return Err(InstrumentError::InvalidPosition(format!(
                "short requires take_profit < entry_price < stop_loss, got {take_profit} < {entry_price} < {stop_loss}"
            )));
        }
        Ok(Self {
            symbol,
            side: Side::Short,
            quantity,
            entry_price,
            entry_time,
            stop_loss,
            take_profit,
            trailing: None,
            margin_usdt: Some(margin_usdt),
            exchange_sl_order_id: None,
            exchange_sl_price: None,
            entry_order_id: None,
            take_profit_order_id: None,
            exit_timeout_count: 0,
        })
    }

    /// Unrealised profit ratio at `price`, positive when in profit.
    pub fn profit_ratio(&self, price: Decimal) -> Decimal {
        match self.side {
            Side::Long => (price - self.entry_price) / self.entry_price,
            Side::Short => (self.entry_price - price) / self.entry_price,
        }
    }

    pub fn hold_duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.entry_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        DateTime::UNIX_EPOCH
    }

    #[test]
    fn long_requires_sl_below_entry_below_tp() {
        assert!(Position::open_long(
            Symbol::from("BTCUSDT"),
            dec!(1),
            dec!(100),
            now(),
            dec!(105),
            dec!(110)
        )
        .is_err());
    }

    #[test]
    fn short_requires_tp_below_entry_below_sl() {
        assert!(Position::open_short(
            Symbol::from("BTCUSDT"),
            dec!(1),
            dec!(100),
            now(),
            dec!(90),
            dec!(105),
            dec!(10)
        )
        .is_err());
        assert!(Position::open_short(
            Symbol::from("BTCUSDT"),
            dec!(1),
            dec!(100),
            now(),
            dec!(105),
            dec!(90),
            dec!(10)
        )
        .is_ok());
    }

    #[test]
    fn profit_ratio_sign_by_side() {
        let long = Position::open_long(Symbol::from("ETHUSDT"), dec!(1), dec!(100), now(), dec!(90), dec!(110)).unwrap();
        assert_eq!(long.profit_ratio(dec!(110)), dec!(0.1));
        let short = Position::open_short(Symbol::from("ETHUSDT"), dec!(1), dec!(100), now(), dec!(110), dec!(90), dec!(10)).unwrap();
        assert_eq!(short.profit_ratio(dec!(90)), dec!(0.1));
    }

    #[test]
    fn legacy_record_without_side_defaults_to_long() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "quantity": "1",
            "entry_price": "100",
            "entry_time": "1970-01-01T00:00:00Z",
            "stop_loss": "90",
            "take_profit": "110",
            "trailing": null,
            "margin_usdt": null,
            "exchange_sl_order_id": null,
            "exchange_sl_price": null,
            "entry_order_id": null,
            "take_profit_order_id": null
        }"#;
        let position: Position = serde_json::from_str(json).unwrap();
        assert_eq!(position.side, Side::Long);
    }
}
