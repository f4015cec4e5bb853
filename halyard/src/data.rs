use halyard_execution::{ExchangeClient, ExecutionError};
use halyard_instrument::{Kline, Symbol, Timeframe};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Symbols fetched concurrently per batch (SPEC_FULL.md §5 backpressure: bounded concurrency
/// rather than one future per configured symbol).
const BATCH_SIZE: usize = 3;

/// Thin K-line cache over one scenario's [`ExchangeClient`] (SPEC_FULL.md §4.2).
///
/// A failed fetch for one symbol never aborts the others — the caller gets back whatever
/// symbols succeeded and a list of the ones that didn't, matching the "Rate-limit: mark symbol
/// failed, continue others" error category (SPEC_FULL.md §7).
#[derive(Debug)]
pub struct DataProvider {
    client: Arc<dyn ExchangeClient>,
}

/// Result of one [`DataProvider::refresh`] call.
#[derive(Debug, Default)]
pub struct RefreshResult {
    pub klines: HashMap<Symbol, Vec<Kline>>,
    pub failed: Vec<Symbol>,
}

impl DataProvider {
    pub fn new(client: Arc<dyn ExchangeClient>) -> Self {
        Self { client }
    }

    /// Fetches `limit` klines for every symbol, `BATCH_SIZE` requests in flight at a time.
    pub async fn refresh(&self, symbols: &[Symbol], timeframe: &Timeframe, limit: usize) -> RefreshResult {
        let mut result = RefreshResult::default();
        for batch in symbols.chunks(BATCH_SIZE) {
            let fetches = batch.iter().map(|symbol| self.fetch_one(symbol, timeframe, limit));
            let outcomes = futures::future::join_all(fetches).await;
            for (symbol, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(klines) => {
                        result.klines.insert(symbol.clone(), klines);
                    }
                    Err(err) => {
                        warn!(%symbol, %err, "kline fetch failed, skipping symbol this tick");
                        result.failed.push(symbol.clone());
                    }
                }
            }
        }
        result
    }

    async fn fetch_one(&self, symbol: &Symbol, timeframe: &Timeframe, limit: usize) -> Result<Vec<Kline>, ExecutionError> {
        self.client.get_klines(symbol, timeframe, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use halyard_execution::{ExchangePosition, OrderReport, SymbolInfo};
    use halyard_instrument::OrderSide;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockClient {
        fail_symbols: Mutex<Vec<Symbol>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExchangeClient for MockClient {
        async fn ping(&self) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn get_klines(&self, symbol: &Symbol, _timeframe: &Timeframe, _limit: usize) -> Result<Vec<Kline>, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_symbols.lock().unwrap().contains(symbol) {
                return Err(ExecutionError::Exchange("boom".into()));
            }
            let now = Utc::now();
            Ok(vec![Kline::new(now, dec!(100), dec!(101), dec!(99), dec!(100), dec!(10), now + chrono::Duration::minutes(1))
                .unwrap()])
        }

        async fn get_price(&self, _symbol: &Symbol) -> Result<Decimal, ExecutionError> {
            Ok(dec!(100))
        }

        async fn get_usdt_balance(&self) -> Result<Decimal, ExecutionError> {
            Ok(dec!(1000))
        }

        async fn market_buy(&self, _symbol: &Symbol, _usdt_amount: Decimal) -> Result<OrderReport, ExecutionError> {
            unimplemented!()
        }

        async fn market_sell(&self, _symbol: &Symbol, _qty: Decimal) -> Result<OrderReport, ExecutionError> {
            unimplemented!()
        }

        async fn market_buy_by_qty(&self, _symbol: &Symbol, _qty: Decimal) -> Result<OrderReport, ExecutionError> {
            unimplemented!()
        }

        async fn place_stop_loss_order(
            &self,
            _symbol: &Symbol,
            _side: OrderSide,
            _qty: Decimal,
            _stop_price: Decimal,
        ) -> Result<OrderReport, ExecutionError> {
            unimplemented!()
        }

        async fn place_take_profit_order(
            &self,
            _symbol: &Symbol,
            _side: OrderSide,
            _qty: Decimal,
            _limit_price: Decimal,
        ) -> Result<OrderReport, ExecutionError> {
            unimplemented!()
        }

        async fn cancel_order(&self, _symbol: &Symbol, _order_id: &str) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn get_order(&self, _symbol: &Symbol, _order_id: &str) -> Result<OrderReport, ExecutionError> {
            unimplemented!()
        }

        async fn get_futures_positions(&self) -> Result<Vec<ExchangePosition>, ExecutionError> {
            Ok(Vec::new())
        }

        async fn get_symbol_info(&self, _symbol: &Symbol) -> Result<SymbolInfo, ExecutionError> {
            Ok(SymbolInfo { step_size: dec!(0.0001) })
        }
    }

    #[tokio::test]
    async fn one_failing_symbol_does_not_block_the_others() {
        let client: Arc<MockClient> = Arc::new(MockClient::default());
        client.fail_symbols.lock().unwrap().push(Symbol::from("ETHUSDT"));
        let provider = DataProvider::new(client.clone() as Arc<dyn ExchangeClient>);
        let symbols = vec![Symbol::from("BTCUSDT"), Symbol::from("ETHUSDT"), Symbol::from("SOLUSDT")];
        let result = provider.refresh(&symbols, &Timeframe::h1(), 100).await;
        assert_eq!(result.klines.len(), 2);
        assert_eq!(result.failed, vec![Symbol::from("ETHUSDT")]);
    }

    #[tokio::test]
    async fn batches_requests_at_the_configured_size() {
        let client: Arc<MockClient> = Arc::new(MockClient::default());
        let provider = DataProvider::new(client.clone() as Arc<dyn ExchangeClient>);
        let symbols: Vec<Symbol> = (0..7).map(|i| Symbol::from(format!("SYM{i}USDT"))).collect();
        let result = provider.refresh(&symbols, &Timeframe::h1(), 50).await;
        assert_eq!(result.klines.len(), 7);
        assert_eq!(client.calls.load(Ordering::SeqCst), 7);
    }
}
