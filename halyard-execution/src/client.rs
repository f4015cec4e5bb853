use crate::error::ExecutionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use halyard_instrument::{Kline, OrderSide, Symbol, Timeframe};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Terminal and non-terminal states an exchange reports for a submitted order
/// (SPEC_FULL.md §6, exchange client contract).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Expired,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Expired | OrderStatus::Rejected
        )
    }
}

/// One fill event against an order; an order may accumulate several on partial fills.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Fill {
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
}

/// Snapshot of an order's state as reported by the exchange (SPEC_FULL.md §6).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderReport {
    pub order_id: String,
    pub status: OrderStatus,
    pub executed_qty: Decimal,
    pub price: Decimal,
    pub fills: Option<Vec<Fill>>,
    pub transact_time: DateTime<Utc>,
}

impl OrderReport {
    /// Average fill price, falling back to the order's limit/quoted price when no fills are
    /// reported (SPEC_FULL.md §4.6, `syncExchangeStopLosses`).
    pub fn average_fill_price(&self) -> Decimal {
        match &self.fills {
            Some(fills) if !fills.is_empty() => {
                let total_qty: Decimal = fills.iter().map(|f| f.qty).sum();
                if total_qty.is_zero() {
                    self.price
                } else {
                    fills.iter().map(|f| f.price * f.qty).sum::<Decimal>() / total_qty
                }
            }
            _ => self.price,
        }
    }
}

/// Exchange-reported lot/step constraints for a traded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SymbolInfo {
    pub step_size: Decimal,
}

/// A futures position as reported directly by the exchange, used by the Position Reconciler
/// (SPEC_FULL.md §4.8).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExchangePosition {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
}

/// Exchange client contract consumed by the execution adapters (SPEC_FULL.md §6).
///
/// Object-safe so Paper/Live/Testnet clients can be swapped per scenario from config without
/// generic propagation through every call site — mirrors the teacher's `ExecutionClient`
/// association, but collapsed to a single non-generic trait since this engine talks to one
/// exchange per scenario rather than routing across a multi-exchange event bus.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn ping(&self) -> Result<(), ExecutionError>;

    async fn get_klines(
        &self,
        symbol: &Symbol,
        timeframe: &Timeframe,
        limit: usize,
    ) -> Result<Vec<Kline>, ExecutionError>;

    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, ExecutionError>;

    async fn get_usdt_balance(&self) -> Result<Decimal, ExecutionError>;

    async fn market_buy(&self, symbol: &Symbol, usdt_amount: Decimal) -> Result<OrderReport, ExecutionError>;

    async fn market_sell(&self, symbol: &Symbol, qty: Decimal) -> Result<OrderReport, ExecutionError>;

    async fn market_buy_by_qty(&self, symbol: &Symbol, qty: Decimal) -> Result<OrderReport, ExecutionError>;

    async fn place_stop_loss_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        qty: Decimal,
        stop_price: Decimal,
    ) -> Result<OrderReport, ExecutionError>;

    async fn place_take_profit_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        qty: Decimal,
        limit_price: Decimal,
    ) -> Result<OrderReport, ExecutionError>;

    async fn cancel_order(&self, symbol: &Symbol, order_id: &str) -> Result<(), ExecutionError>;

    async fn get_order(&self, symbol: &Symbol, order_id: &str) -> Result<OrderReport, ExecutionError>;

    async fn get_futures_positions(&self) -> Result<Vec<ExchangePosition>, ExecutionError>;

    async fn get_symbol_info(&self, symbol: &Symbol) -> Result<SymbolInfo, ExecutionError>;
}

/// Rejects any non-positive price. `Decimal` has no `NaN`/`Infinity` representation, so those
/// classes of invalid price (SPEC_FULL.md §4.7) are structurally unreachable once a value has
/// been parsed into a `Decimal` at all; this only needs to guard the `<= 0` case.
pub fn validate_price(price: Decimal) -> Result<(), ExecutionError> {
    if price <= Decimal::ZERO {
        return Err(ExecutionError::InvalidPrice(format!("{price}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_non_positive_price() {
        assert!(validate_price(dec!(0)).is_err());
        assert!(validate_price(dec!(-1)).is_err());
        assert!(validate_price(dec!(100)).is_ok());
    }

    #[test]
    fn average_fill_price_falls_back_to_quoted_price_without_fills() {
        let report = OrderReport {
            order_id: "1".into(),
            status: OrderStatus::Filled,
            executed_qty: dec!(1),
            price: dec!(100),
            fills: None,
            transact_time: Utc::now(),
        };
        assert_eq!(report.average_fill_price(), dec!(100));
    }

    #[test]
    fn average_fill_price_is_volume_weighted() {
        let report = OrderReport {
            order_id: "1".into(),
            status: OrderStatus::Filled,
            executed_qty: dec!(3),
            price: dec!(100),
            fills: Some(vec![
                Fill { price: dec!(99), qty: dec!(1), commission: dec!(0) },
                Fill { price: dec!(101), qty: dec!(2), commission: dec!(0) },
            ]),
            transact_time: Utc::now(),
        };
        assert_eq!(report.average_fill_price(), dec!(100.333333333333333333333333333));
    }
}
