use crate::{position::Position, side::Side, symbol::Symbol};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Append-only execution record. Entry trades carry no `pnl`; exit trades always do.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    pub id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub usdt_amount: Decimal,
    pub fee: Decimal,
    pub slippage: Decimal,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub pnl: Option<Decimal>,
    pub pnl_percent: Option<Decimal>,
}

/// An order the engine is still waiting on a terminal state for.
///
/// Present in [`Account::open_orders`] iff the Order State Machine has not yet observed a
/// terminal status; garbage-collected once it has (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PendingOrder {
    pub order_id: String,
    pub symbol: Symbol,
    pub side: crate::side::OrderSide,
    pub placed_at: DateTime<Utc>,
    pub requested_qty: Decimal,
    pub filled_qty: Decimal,
    pub timeout_ms: i64,
    /// Set when this order is closing a position rather than opening one; the Order State
    /// Machine escalates repeated exit timeouts to forced-exit, but never entry timeouts.
    pub is_exit: bool,
}

impl PendingOrder {
    pub fn deadline(&self) -> DateTime<Utc> {
        self.placed_at + chrono::Duration::milliseconds(self.timeout_ms)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }
}

/// UTC-day-scoped realised-loss ledger used by the daily-loss kill condition.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DailyLoss {
    pub date: NaiveDate,
    pub loss: Decimal,
}

impl DailyLoss {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, loss: Decimal::ZERO }
    }

    /// Resets to zero when `today` has crossed a UTC day boundary relative to the stored date.
    pub fn reset_if_needed(&mut self, today: NaiveDate) {
        if self.date != today {
            self.date = today;
            self.loss = Decimal::ZERO;
        }
    }

    pub fn record_loss(&mut self, today: NaiveDate, loss: Decimal) {
        self.reset_if_needed(today);
        if loss > Decimal::ZERO {
            self.loss += loss;
        }
    }
}

/// Isolated per-scenario trading account.
///
/// `initial_usdt` is immutable for the scenario's lifetime; `usdt` is clamped to never go
/// negative by every mutating method on this type (SPEC_FULL.md §3, §8 universal invariants).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Account {
    pub initial_usdt: Decimal,
    pub usdt: Decimal,
    pub positions: HashMap<Symbol, Position>,
    pub trades: Vec<Trade>,
    pub open_orders: HashMap<String, PendingOrder>,
    pub daily_loss: DailyLoss,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(initial_usdt: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            initial_usdt,
            usdt: initial_usdt,
            positions: HashMap::new(),
            trades: Vec::new(),
            open_orders: HashMap::new(),
            daily_loss: DailyLoss::new(now.date_naive()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Clamps `usdt` to zero; called after every debit so a sequence of fee/slippage
    /// miscalculations can never drive cash negative (SPEC_FULL.md §8).
    pub fn clamp_cash(&mut self) {
        if self.usdt < Decimal::ZERO {
            self.usdt = Decimal::ZERO;
        }
    }

    pub fn debit(&mut self, amount: Decimal) {
        self.usdt -= amount;
        self.clamp_cash();
    }

    pub fn credit(&mut self, amount: Decimal) {
        self.usdt += amount;
    }

    pub fn push_trade(&mut self, trade: Trade) {
        if let Some(pnl) = trade.pnl {
            if pnl < Decimal::ZERO {
                self.daily_loss.record_loss(trade.timestamp.date_naive(), -pnl);
            }
        }
        self.trades.push(trade);
        self.updated_at = Utc::now();
    }

    /// USDT cash plus the notional of every open position, valued at `prices[symbol]` when
    /// available and falling back to `entry_price` otherwise (SPEC_FULL.md §4.10).
    pub fn total_equity(&self, prices: &HashMap<Symbol, Decimal>) -> Decimal {
        let positions_value: Decimal = self
            .positions
            .values()
            .map(|p| {
                let price = prices.get(&p.symbol).copied().unwrap_or(p.entry_price);
                price * p.quantity
            })
            .sum();
        self.usdt + positions_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn debit_never_goes_negative() {
        let mut acct = Account::new(dec!(100), Utc::now());
        acct.debit(dec!(500));
        assert_eq!(acct.usdt, Decimal::ZERO);
    }

    #[test]
    fn losing_trade_updates_daily_loss() {
        let mut acct = Account::new(dec!(1000), Utc::now());
        let now = Utc::now();
        acct.push_trade(Trade {
            id: "1".into(),
            symbol: Symbol::from("BTCUSDT"),
            side: Side::Long,
            quantity: dec!(1),
            price: dec!(90),
            usdt_amount: dec!(90),
            fee: dec!(0),
            slippage: dec!(0),
            timestamp: now,
            reason: "stop_loss".into(),
            pnl: Some(dec!(-10)),
            pnl_percent: Some(dec!(-0.1)),
        });
        assert_eq!(acct.daily_loss.loss, dec!(10));
    }

    #[test]
    fn daily_loss_resets_on_new_utc_day() {
        let mut dl = DailyLoss::new(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        dl.record_loss(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), dec!(50));
        assert_eq!(dl.loss, dec!(50));
        dl.reset_if_needed(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        assert_eq!(dl.loss, Decimal::ZERO);
    }

    #[test]
    fn initial_usdt_is_immutable_field() {
        let mut acct = Account::new(dec!(1000), Utc::now());
        acct.debit(dec!(200));
        acct.credit(dec!(50));
        assert_eq!(acct.initial_usdt, dec!(1000));
    }
}
