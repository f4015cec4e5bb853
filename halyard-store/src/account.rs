use crate::atomic::{account_path, read_json_lenient, write_json_atomic};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use halyard_instrument::{Account, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;

/// Durable per-scenario account state (SPEC_FULL.md §4.10).
///
/// Every scenario owns exactly one account file; two scenarios never contend for the same
/// path, so no cross-scenario locking is needed beyond the atomic rename itself.
#[derive(Debug, Clone)]
pub struct AccountStore {
    dir: PathBuf,
}

impl AccountStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the existing account for `scenario_id`, or initializes one with `initial_usdt`
    /// on first access.
    pub async fn load_account(&self, scenario_id: &str, initial_usdt: Decimal, now: DateTime<Utc>) -> Result<Account, StoreError> {
        let path = account_path(&self.dir, scenario_id);
        match read_json_lenient::<Account>(&path).await {
            Some(account) => Ok(account),
            None => Ok(Account::new(initial_usdt, now)),
        }
    }

    pub async fn save_account(&self, scenario_id: &str, account: &Account) -> Result<(), StoreError> {
        write_json_atomic(&account_path(&self.dir, scenario_id), account).await
    }

    pub fn reset_daily_loss_if_needed(&self, account: &mut Account, today: chrono::NaiveDate) {
        account.daily_loss.reset_if_needed(today);
    }

    pub fn calc_total_equity(&self, account: &Account, current_prices: &HashMap<Symbol, Decimal>) -> Decimal {
        account.total_equity(current_prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn load_account_initializes_on_first_access() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path());
        let now = Utc::now();
        let account = store.load_account("scenario-a", dec!(1000), now).await.unwrap();
        assert_eq!(account.usdt, dec!(1000));
        assert!(account.positions.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path());
        let now = Utc::now();
        let mut account = store.load_account("scenario-a", dec!(1000), now).await.unwrap();
        account.debit(dec!(50));
        store.save_account("scenario-a", &account).await.unwrap();

        let reloaded = store.load_account("scenario-a", dec!(1000), now).await.unwrap();
        assert_eq!(reloaded.usdt, dec!(950));
    }

    #[tokio::test]
    async fn reset_daily_loss_zeroes_on_new_utc_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path());
        let now = Utc::now();
        let mut account = store.load_account("scenario-a", dec!(1000), now).await.unwrap();
        account.daily_loss.record_loss(now.date_naive(), dec!(20));
        assert_eq!(account.daily_loss.loss, dec!(20));

        let tomorrow = now.date_naive() + chrono::Duration::days(1);
        store.reset_daily_loss_if_needed(&mut account, tomorrow);
        assert_eq!(account.daily_loss.loss, Decimal::ZERO);
    }

    #[tokio::test]
    async fn total_equity_falls_back_to_entry_price_when_no_quote() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path());
        let now = Utc::now();
        let mut account = store.load_account("scenario-a", dec!(1000), now).await.unwrap();
        let symbol = Symbol::from("BTCUSDT");
        let position = halyard_instrument::Position::open_long(symbol.clone(), dec!(1), dec!(100), now, dec!(90), dec!(120)).unwrap();
        account.positions.insert(symbol, position);

        let equity = store.calc_total_equity(&account, &HashMap::new());
        assert_eq!(equity, account.usdt + dec!(100));
    }
}
