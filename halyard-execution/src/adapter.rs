use crate::client::ExchangeClient;
use crate::error::{ExecutionError, RejectReason};
use crate::order_state::OrderStateMachine;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use halyard_instrument::{Account, OrderSide, Position, Side, Symbol, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Execution parameters shared by both adapters (SPEC_FULL.md §4.7, §6 `execution{}` block).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AdapterConfig {
    pub fee_rate: Decimal,
    pub slippage_percent: Decimal,
    pub max_positions: usize,
    pub daily_loss_limit_percent: Decimal,
    pub min_order_usdt: Decimal,
    /// Live-only; `None` disables the entry-slippage pre-trade check entirely.
    pub max_entry_slippage: Option<Decimal>,
}

/// Pre-trade checks applied in this exact order by both implementations (SPEC_FULL.md §4.7).
fn pre_trade_checks(
    account: &Account,
    symbol: &Symbol,
    usdt_to_spend: Decimal,
    cfg: &AdapterConfig,
) -> Result<(), RejectReason> {
    if account.positions.len() >= cfg.max_positions {
        return Err(RejectReason::MaxPositions);
    }
    if account.positions.contains_key(symbol) {
        return Err(RejectReason::SymbolAlreadyHeld);
    }
    let equity = account.usdt + account.positions.values().map(|p| p.quantity * p.entry_price).sum::<Decimal>();
    if equity > Decimal::ZERO {
        let loss_ratio = account.daily_loss.loss / equity;
        if loss_ratio >= cfg.daily_loss_limit_percent {
            return Err(RejectReason::DailyLossLimit);
        }
    }
    if usdt_to_spend < cfg.min_order_usdt {
        return Err(RejectReason::BelowMinOrderUsdt);
    }
    Ok(())
}

fn entry_slippage_check(signal_price: Decimal, current_price: Decimal, cfg: &AdapterConfig) -> Result<(), RejectReason> {
    if let Some(max_slippage) = cfg.max_entry_slippage {
        if signal_price > Decimal::ZERO {
            let slippage = (current_price - signal_price).abs() / signal_price;
            if slippage > max_slippage {
                return Err(RejectReason::ExcessiveSlippage);
            }
        }
    }
    Ok(())
}

fn trade_id(symbol: &Symbol, now: DateTime<Utc>) -> String {
    format!("{symbol}-{}", now.timestamp_nanos_opt().unwrap_or_default())
}

/// Two implementations, one contract (SPEC_FULL.md §4.7).
///
/// `Option<Trade>` is `None` on a pre-trade rejection or repeated open on an already-held
/// symbol: the adapter never mutates account state in that case (idempotent, defensive per
/// §4.7).
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    async fn open_long(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError>;

    async fn open_short(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError>;

    async fn close_long(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        reason: &str,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError>;

    async fn close_short(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        reason: &str,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError>;

    async fn force_exit(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        reason: &str,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError>;
}

/// Simulated fills; no order ever leaves the process (SPEC_FULL.md §4.7 Paper column).
#[derive(Debug, Default)]
pub struct PaperAdapter;

impl PaperAdapter {
    pub fn new() -> Self {
        Self
    }

    fn fill_price(price: Decimal, slippage_percent: Decimal, worse_direction: Decimal) -> Decimal {
        price + price * slippage_percent * worse_direction
    }
}

#[async_trait]
impl ExecutionAdapter for PaperAdapter {
    async fn open_long(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        crate::client::validate_price(price)?;
        let fill_price = Self::fill_price(price, cfg.slippage_percent, Decimal::ONE);
        let usdt_amount = fill_price * quantity;
        if pre_trade_checks(account, symbol, usdt_amount, cfg).is_err() {
            return Ok(None);
        }
        let fee = usdt_amount * cfg.fee_rate;
        if account.usdt < usdt_amount + fee {
            return Ok(None);
        }
        let position = Position::open_long(symbol.clone(), quantity, fill_price, now, stop_loss, take_profit)?;
        account.debit(usdt_amount + fee);
        account.positions.insert(symbol.clone(), position);
        let trade = Trade {
            id: trade_id(symbol, now),
            symbol: symbol.clone(),
            side: Side::Long,
            quantity,
            price: fill_price,
            usdt_amount,
            fee,
            slippage: fill_price - price,
            timestamp: now,
            reason: "open_long".into(),
            pnl: None,
            pnl_percent: None,
        };
        account.push_trade(trade.clone());
        info!(%symbol, %fill_price, %quantity, "paper open_long filled");
        Ok(Some(trade))
    }

    async fn open_short(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        crate::client::validate_price(price)?;
        let fill_price = Self::fill_price(price, cfg.slippage_percent, -Decimal::ONE);
        let margin_usdt = fill_price * quantity;
        if pre_trade_checks(account, symbol, margin_usdt, cfg).is_err() {
            return Ok(None);
        }
        let fee = margin_usdt * cfg.fee_rate;
        if account.usdt < margin_usdt + fee {
            return Ok(None);
        }
        let position = Position::open_short(symbol.clone(), quantity, fill_price, now, stop_loss, take_profit, margin_usdt)?;
        account.debit(margin_usdt + fee);
        account.positions.insert(symbol.clone(), position);
        let trade = Trade {
            id: trade_id(symbol, now),
            symbol: symbol.clone(),
            side: Side::Short,
            quantity,
            price: fill_price,
            usdt_amount: margin_usdt,
            fee,
            slippage: price - fill_price,
            timestamp: now,
            reason: "open_short".into(),
            pnl: None,
            pnl_percent: None,
        };
        account.push_trade(trade.clone());
        info!(%symbol, %fill_price, %quantity, "paper open_short filled");
        Ok(Some(trade))
    }

    async fn close_long(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        reason: &str,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        crate::client::validate_price(price)?;
        let Some(position) = account.positions.remove(symbol) else {
            return Ok(None);
        };
        let fill_price = Self::fill_price(price, cfg.slippage_percent, -Decimal::ONE);
        let usdt_amount = fill_price * position.quantity;
        let fee = usdt_amount * cfg.fee_rate;
        account.credit(usdt_amount - fee);
        let cost_basis = position.entry_price * position.quantity;
        let pnl = usdt_amount - fee - cost_basis;
        let pnl_percent = if cost_basis > Decimal::ZERO { pnl / cost_basis } else { Decimal::ZERO };
        let trade = Trade {
            id: trade_id(symbol, now),
            symbol: symbol.clone(),
            side: Side::Long,
            quantity: position.quantity,
            price: fill_price,
            usdt_amount,
            fee,
            slippage: price - fill_price,
            timestamp: now,
            reason: reason.to_string(),
            pnl: Some(pnl),
            pnl_percent: Some(pnl_percent),
        };
        account.push_trade(trade.clone());
        info!(%symbol, %fill_price, %pnl, reason, "paper close_long filled");
        Ok(Some(trade))
    }

    async fn close_short(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        reason: &str,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        crate::client::validate_price(price)?;
        let Some(position) = account.positions.remove(symbol) else {
            return Ok(None);
        };
        let fill_price = Self::fill_price(price, cfg.slippage_percent, Decimal::ONE);
        let pnl_per_unit = position.entry_price - fill_price;
        let pnl = pnl_per_unit * position.quantity;
        let fee = fill_price * position.quantity * cfg.fee_rate;
        let margin_usdt = position.margin_usdt.unwrap_or_default();
        account.credit(margin_usdt + pnl - fee);
        let cost_basis = position.entry_price * position.quantity;
        let pnl_percent = if cost_basis > Decimal::ZERO { (pnl - fee) / cost_basis } else { Decimal::ZERO };
        let trade = Trade {
            id: trade_id(symbol, now),
            symbol: symbol.clone(),
            side: Side::Short,
            quantity: position.quantity,
            price: fill_price,
            usdt_amount: margin_usdt,
            fee,
            slippage: fill_price - price,
            timestamp: now,
            reason: reason.to_string(),
            pnl: Some(pnl - fee),
            pnl_percent: Some(pnl_percent),
        };
        account.push_trade(trade.clone());
        info!(%symbol, %fill_price, pnl = %(pnl - fee), reason, "paper close_short filled");
        Ok(Some(trade))
    }

    async fn force_exit(
        &self,
        _account: &mut Account,
        _symbol: &Symbol,
        _price: Decimal,
        _reason: &str,
        _cfg: &AdapterConfig,
        _now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        // Paper has no exchange-side stop orders or native positions to force-close.
        Ok(None)
    }
}

/// Live (or testnet) execution against a real [`ExchangeClient`] (SPEC_FULL.md §4.7 Live column).
pub struct LiveAdapter<C: ExchangeClient> {
    client: Arc<C>,
    order_state: OrderStateMachine,
}

impl<C: ExchangeClient> LiveAdapter<C> {
    pub fn new(client: Arc<C>, order_state: OrderStateMachine) -> Self {
        Self { client, order_state }
    }

    pub fn order_state(&self) -> &OrderStateMachine {
        &self.order_state
    }
}

#[async_trait]
impl<C: ExchangeClient> ExecutionAdapter for LiveAdapter<C> {
    async fn open_long(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        crate::client::validate_price(price)?;
        let current_price = self.client.get_price(symbol).await?;
        if entry_slippage_check(price, current_price, cfg).is_err() {
            return Ok(None);
        }
        let usdt_amount = current_price * quantity;
        if pre_trade_checks(account, symbol, usdt_amount, cfg).is_err() {
            return Ok(None);
        }
        let report = self.client.market_buy(symbol, usdt_amount).await?;
        let fill_price = report.average_fill_price();
        let fee = report.fills.as_ref().map(|f| f.iter().map(|f| f.commission).sum()).unwrap_or_default();
        let position = Position::open_long(symbol.clone(), report.executed_qty, fill_price, now, stop_loss, take_profit)?;
        let sl_report = self
            .client
            .place_stop_loss_order(symbol, OrderSide::Sell, report.executed_qty, stop_loss)
            .await;
        let mut position = position;
        if let Ok(sl) = sl_report {
            position.exchange_sl_order_id = Some(sl.order_id);
            position.exchange_sl_price = Some(stop_loss);
        } else {
            warn!(%symbol, "failed to place native stop loss after open_long");
        }
        account.debit(fill_price * report.executed_qty + fee);
        account.positions.insert(symbol.clone(), position);
        let trade = Trade {
            id: report.order_id.clone(),
            symbol: symbol.clone(),
            side: Side::Long,
            quantity: report.executed_qty,
            price: fill_price,
            usdt_amount: fill_price * report.executed_qty,
            fee,
            slippage: fill_price - price,
            timestamp: now,
            reason: "open_long".into(),
            pnl: None,
            pnl_percent: None,
        };
        account.push_trade(trade.clone());
        Ok(Some(trade))
    }

    async fn open_short(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        crate::client::validate_price(price)?;
        let current_price = self.client.get_price(symbol).await?;
        if entry_slippage_check(price, current_price, cfg).is_err() {
            return Ok(None);
        }
        let margin_usdt = current_price * quantity;
        if pre_trade_checks(account, symbol, margin_usdt, cfg).is_err() {
            return Ok(None);
        }
        let report = self.client.market_sell(symbol, quantity).await?;
        let fill_price = report.average_fill_price();
        let fee = report.fills.as_ref().map(|f| f.iter().map(|f| f.commission).sum()).unwrap_or_default();
        let mut position =
            Position::open_short(symbol.clone(), report.executed_qty, fill_price, now, stop_loss, take_profit, margin_usdt)?;
        if let Ok(sl) = self.client.place_stop_loss_order(symbol, OrderSide::Buy, report.executed_qty, stop_loss).await {
            position.exchange_sl_order_id = Some(sl.order_id);
            position.exchange_sl_price = Some(stop_loss);
        } else {
            warn!(%symbol, "failed to place native stop loss after open_short");
        }
        account.debit(margin_usdt + fee);
        account.positions.insert(symbol.clone(), position);
        let trade = Trade {
            id: report.order_id.clone(),
            symbol: symbol.clone(),
            side: Side::Short,
            quantity: report.executed_qty,
            price: fill_price,
            usdt_amount: margin_usdt,
            fee,
            slippage: price - fill_price,
            timestamp: now,
            reason: "open_short".into(),
            pnl: None,
            pnl_percent: None,
        };
        account.push_trade(trade.clone());
        Ok(Some(trade))
    }

    async fn close_long(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        reason: &str,
        _cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        crate::client::validate_price(price)?;
        let Some(position) = account.positions.remove(symbol) else {
            return Ok(None);
        };
        if let Some(order_id) = &position.exchange_sl_order_id {
            // Idempotent; a failure here is logged, never fatal (SPEC_FULL.md §4.6).
            if self.client.cancel_order(symbol, order_id).await.is_err() {
                warn!(%symbol, order_id, "failed to cancel native stop loss before close_long");
            }
        }
        let report = self.client.market_sell(symbol, position.quantity).await?;
        let fill_price = report.average_fill_price();
        let fee = report.fills.as_ref().map(|f| f.iter().map(|f| f.commission).sum()).unwrap_or_default();
        let usdt_amount = fill_price * report.executed_qty;
        account.credit(usdt_amount - fee);
        let cost_basis = position.entry_price * position.quantity;
        let pnl = usdt_amount - fee - cost_basis;
        let pnl_percent = if cost_basis > Decimal::ZERO { pnl / cost_basis } else { Decimal::ZERO };
        let trade = Trade {
            id: report.order_id.clone(),
            symbol: symbol.clone(),
            side: Side::Long,
            quantity: report.executed_qty,
            price: fill_price,
            usdt_amount,
            fee,
            slippage: price - fill_price,
            timestamp: now,
            reason: reason.to_string(),
            pnl: Some(pnl),
            pnl_percent: Some(pnl_percent),
        };
        account.push_trade(trade.clone());
        Ok(Some(trade))
    }

    async fn close_short(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        reason: &str,
        _cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        crate::client::validate_price(price)?;
        let Some(position) = account.positions.remove(symbol) else {
            return Ok(None);
        };
        if let Some(order_id) = &position.exchange_sl_order_id {
            if self.client.cancel_order(symbol, order_id).await.is_err() {
                warn!(%symbol, order_id, "failed to cancel native stop loss before close_short");
            }
        }
        let report = self.client.market_buy_by_qty(symbol, position.quantity).await?;
        let fill_price = report.average_fill_price();
        let fee = report.fills.as_ref().map(|f| f.iter().map(|f| f.commission).sum()).unwrap_or_default();
        let pnl = (position.entry_price - fill_price) * position.quantity - fee;
        let margin_usdt = position.margin_usdt.unwrap_or_default();
        account.credit(margin_usdt + pnl);
        let cost_basis = position.entry_price * position.quantity;
        let pnl_percent = if cost_basis > Decimal::ZERO { pnl / cost_basis } else { Decimal::ZERO };
        let trade = Trade {
            id: report.order_id.clone(),
            symbol: symbol.clone(),
            side: Side::Short,
            quantity: report.executed_qty,
            price: fill_price,
            usdt_amount: margin_usdt,
            fee,
            slippage: fill_price - price,
            timestamp: now,
            reason: reason.to_string(),
            pnl: Some(pnl),
            pnl_percent: Some(pnl_percent),
        };
        account.push_trade(trade.clone());
        Ok(Some(trade))
    }

    async fn force_exit(
        &self,
        account: &mut Account,
        symbol: &Symbol,
        price: Decimal,
        reason: &str,
        cfg: &AdapterConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, ExecutionError> {
        let Some(position) = account.positions.get(symbol).cloned() else {
            return Ok(None);
        };
        if let Some(order_id) = &position.exchange_sl_order_id {
            let _ = self.client.cancel_order(symbol, order_id).await;
        }
        if let Some(order_id) = &position.take_profit_order_id {
            let _ = self.client.cancel_order(symbol, order_id).await;
        }
        warn!(%symbol, reason, "forced exit: escalating to market close");
        match position.side {
            Side::Long => self.close_long(account, symbol, price, reason, cfg, now).await,
            Side::Short => self.close_short(account, symbol, price, reason, cfg, now).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn cfg() -> AdapterConfig {
        AdapterConfig {
            fee_rate: dec!(0.001),
            slippage_percent: dec!(0.001),
            max_positions: 3,
            daily_loss_limit_percent: dec!(0.05),
            min_order_usdt: dec!(10),
            max_entry_slippage: None,
        }
    }

    #[tokio::test]
    async fn paper_open_long_then_close_long_is_profitable_on_price_rise() {
        let adapter = PaperAdapter::new();
        let mut account = Account::new(dec!(1000), Utc::now());
        let symbol = Symbol::from("BTCUSDT");
        let trade = adapter
            .open_long(&mut account, &symbol, dec!(100), dec!(1), dec!(90), dec!(120), &cfg(), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trade.side, Side::Long);
        assert!(account.positions.contains_key(&symbol));

        let exit = adapter
            .close_long(&mut account, &symbol, dec!(110), "take_profit", &cfg(), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert!(exit.pnl.unwrap() > Decimal::ZERO);
        assert!(!account.positions.contains_key(&symbol));
    }

    #[tokio::test]
    async fn repeated_open_on_held_symbol_is_idempotent_none() {
        let adapter = PaperAdapter::new();
        let mut account = Account::new(dec!(1000), Utc::now());
        let symbol = Symbol::from("BTCUSDT");
        adapter
            .open_long(&mut account, &symbol, dec!(100), dec!(1), dec!(90), dec!(120), &cfg(), Utc::now())
            .await
            .unwrap();
        let second = adapter
            .open_long(&mut account, &symbol, dec!(100), dec!(1), dec!(90), dec!(120), &cfg(), Utc::now())
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn invalid_price_is_rejected_without_mutating_account() {
        let adapter = PaperAdapter::new();
        let mut account = Account::new(dec!(1000), Utc::now());
        let symbol = Symbol::from("BTCUSDT");
        let before = account.clone();
        let result = adapter
            .open_long(&mut account, &symbol, dec!(-5), dec!(1), dec!(90), dec!(120), &cfg(), Utc::now())
            .await;
        assert!(result.is_err());
        assert_eq!(account, before);
    }

    #[tokio::test]
    async fn below_min_order_usdt_is_rejected() {
        let adapter = PaperAdapter::new();
        let mut account = Account::new(dec!(1000), Utc::now());
        let symbol = Symbol::from("BTCUSDT");
        let result = adapter
            .open_long(&mut account, &symbol, dec!(1), dec!(1), dec!(0.9), dec!(1.2), &cfg(), Utc::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn position_cap_allows_exactly_max_positions_opens() {
        let adapter = PaperAdapter::new();
        let mut account = Account::new(dec!(10000), Utc::now());
        let symbols = ["AUSDT", "BUSDT", "CUSDT", "DUSDT"];
        let mut opened = 0;
        for s in symbols {
            let result = adapter
                .open_long(&mut account, &Symbol::from(s), dec!(100), dec!(1), dec!(90), dec!(120), &cfg(), Utc::now())
                .await
                .unwrap();
            if result.is_some() {
                opened += 1;
            }
        }
        assert_eq!(opened, cfg().max_positions);
        assert_eq!(account.positions.len(), cfg().max_positions);
    }

    #[tokio::test]
    async fn account_cash_never_goes_negative_across_a_sequence_of_opens() {
        let adapter = PaperAdapter::new();
        let mut account = Account::new(dec!(50), Utc::now());
        for i in 0..5 {
            let symbol = Symbol::from(format!("SYM{i}USDT"));
            let _ = adapter
                .open_long(&mut account, &symbol, dec!(100), dec!(1), dec!(90), dec!(120), &cfg(), Utc::now())
                .await;
            assert!(account.usdt >= Decimal::ZERO);
        }
    }
}
