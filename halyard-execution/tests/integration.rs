use async_trait::async_trait;
use chrono::Utc;
use halyard_execution::{
    AdapterConfig, ExchangeClient, ExchangePosition, ExecutionAdapter, ExecutionError, Fill,
    LiveAdapter, OrderReport, OrderStateMachine, OrderStatus, PaperAdapter, SymbolInfo,
};
use halyard_instrument::{Account, Kline, OrderSide, Symbol, Timeframe};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

fn cfg() -> AdapterConfig {
    AdapterConfig {
        fee_rate: dec!(0.001),
        slippage_percent: dec!(0.001),
        max_positions: 5,
        daily_loss_limit_percent: dec!(0.1),
        min_order_usdt: dec!(10),
        max_entry_slippage: Some(dec!(0.02)),
    }
}

#[derive(Default)]
struct MockClient {
    next_order_id: Mutex<u64>,
    stop_loss_status: Mutex<OrderStatus>,
}

impl MockClient {
    fn new() -> Self {
        Self { next_order_id: Mutex::new(1), stop_loss_status: Mutex::new(OrderStatus::New) }
    }

    fn order(&self, price: Decimal, qty: Decimal) -> OrderReport {
        let mut id = self.next_order_id.lock().unwrap();
        *id += 1;
        OrderReport {
            order_id: format!("ord-{id}"),
            status: OrderStatus::Filled,
            executed_qty: qty,
            price,
            fills: Some(vec![Fill { price, qty, commission: dec!(0.1) }]),
            transact_time: Utc::now(),
        }
    }
}

#[async_trait]
impl ExchangeClient for MockClient {
    async fn ping(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn get_klines(&self, _symbol: &Symbol, _timeframe: &Timeframe, _limit: usize) -> Result<Vec<Kline>, ExecutionError> {
        Ok(Vec::new())
    }

    async fn get_price(&self, _symbol: &Symbol) -> Result<Decimal, ExecutionError> {
        Ok(dec!(100))
    }

    async fn get_usdt_balance(&self) -> Result<Decimal, ExecutionError> {
        Ok(dec!(1000))
    }

    async fn market_buy(&self, _symbol: &Symbol, usdt_amount: Decimal) -> Result<OrderReport, ExecutionError> {
        Ok(self.order(dec!(100), usdt_amount / dec!(100)))
    }

    async fn market_sell(&self, _symbol: &Symbol, qty: Decimal) -> Result<OrderReport, ExecutionError> {
        Ok(self.order(dec!(100), qty))
    }

    async fn market_buy_by_qty(&self, _symbol: &Symbol, qty: Decimal) -> Result<OrderReport, ExecutionError> {
        Ok(self.order(dec!(100), qty))
    }

    async fn place_stop_loss_order(
        &self,
        _symbol: &Symbol,
        _side: OrderSide,
        qty: Decimal,
        stop_price: Decimal,
    ) -> Result<OrderReport, ExecutionError> {
        Ok(self.order(stop_price, qty))
    }

    async fn place_take_profit_order(
        &self,
        _symbol: &Symbol,
        _side: OrderSide,
        qty: Decimal,
        limit_price: Decimal,
    ) -> Result<OrderReport, ExecutionError> {
        Ok(self.order(limit_price, qty))
    }

    async fn cancel_order(&self, _symbol: &Symbol, _order_id: &str) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn get_order(&self, _symbol: &Symbol, order_id: &str) -> Result<OrderReport, ExecutionError> {
        let status = *self.stop_loss_status.lock().unwrap();
        Ok(OrderReport {
            order_id: order_id.to_string(),
            status,
            executed_qty: dec!(1),
            price: dec!(90),
            fills: None,
            transact_time: Utc::now(),
        })
    }

    async fn get_futures_positions(&self) -> Result<Vec<ExchangePosition>, ExecutionError> {
        Ok(Vec::new())
    }

    async fn get_symbol_info(&self, _symbol: &Symbol) -> Result<SymbolInfo, ExecutionError> {
        Ok(SymbolInfo { step_size: dec!(0.001) })
    }
}

#[tokio::test]
async fn paper_adapter_round_trips_a_long_position() {
    let adapter = PaperAdapter::new();
    let mut account = Account::new(dec!(1000), Utc::now());
    let symbol = Symbol::from("BTCUSDT");
    adapter
        .open_long(&mut account, &symbol, dec!(100), dec!(1), dec!(90), dec!(120), &cfg(), Utc::now())
        .await
        .unwrap();
    assert!(account.positions.contains_key(&symbol));
    adapter
        .close_long(&mut account, &symbol, dec!(115), "take_profit", &cfg(), Utc::now())
        .await
        .unwrap();
    assert!(!account.positions.contains_key(&symbol));
    assert_eq!(account.trades.len(), 2);
}

#[tokio::test]
async fn live_adapter_places_native_stop_on_open_and_syncs_fill() {
    let client = Arc::new(MockClient::new());
    let adapter = LiveAdapter::new(client.clone(), OrderStateMachine::new());
    let mut account = Account::new(dec!(1000), Utc::now());
    let symbol = Symbol::from("BTCUSDT");

    adapter
        .open_long(&mut account, &symbol, dec!(100), dec!(1), dec!(90), dec!(120), &cfg(), Utc::now())
        .await
        .unwrap();
    let position = account.positions.get(&symbol).unwrap();
    assert!(position.exchange_sl_order_id.is_some());

    *client.stop_loss_status.lock().unwrap() = OrderStatus::Filled;
    adapter.order_state().sync_exchange_stop_losses(&mut account, client.as_ref(), Utc::now()).await.unwrap();
    assert!(!account.positions.contains_key(&symbol));
    assert_eq!(account.trades.last().unwrap().reason, "stop_loss_exchange");
}

#[tokio::test]
async fn live_adapter_rejects_entry_beyond_max_slippage() {
    let client = Arc::new(MockClient::new());
    let adapter = LiveAdapter::new(client, OrderStateMachine::new());
    let mut account = Account::new(dec!(1000), Utc::now());
    let symbol = Symbol::from("BTCUSDT");

    // Signal price far from the mock's fixed current price of 100 triggers the slippage guard.
    let result = adapter
        .open_long(&mut account, &symbol, dec!(50), dec!(1), dec!(45), dec!(60), &cfg(), Utc::now())
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(account.positions.is_empty());
}
