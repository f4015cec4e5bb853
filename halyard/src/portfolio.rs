use halyard_instrument::{Account, Symbol};
use halyard_risk::ExposureTracker;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Portfolio-level exposure snapshot, recomputed fresh from current positions every tick
/// (SPEC_FULL.md §4.9) rather than carried across ticks — a scenario's positions are the
/// source of truth, so there is nothing an accumulated tracker would tell us that re-deriving
/// doesn't.
#[derive(Debug, Clone)]
pub struct ExposureSummary {
    pub notional_by_symbol: HashMap<Symbol, Decimal>,
    pub total_notional: Decimal,
    pub equity: Decimal,
    /// `total_notional / equity`; zero when equity is non-positive.
    pub leverage: Decimal,
}

/// Symbols whose notional exceeds `max_position_per_symbol * equity` (SPEC_FULL.md §4.9).
pub fn symbols_over_limit(summary: &ExposureSummary, max_position_per_symbol: Decimal) -> Vec<Symbol> {
    if summary.equity <= Decimal::ZERO {
        return Vec::new();
    }
    let limit = summary.equity * max_position_per_symbol;
    summary
        .notional_by_symbol
        .iter()
        .filter(|(_, notional)| **notional > limit)
        .map(|(symbol, _)| symbol.clone())
        .collect()
}

/// Builds the exposure summary for one scenario tick, valuing every open position at
/// `prices[symbol]` and falling back to entry price when no fresh quote is available, matching
/// [`Account::total_equity`].
pub fn summarize(account: &Account, prices: &HashMap<Symbol, Decimal>) -> ExposureSummary {
    let mut tracker = ExposureTracker::new();
    for position in account.positions.values() {
        let price = prices.get(&position.symbol).copied().unwrap_or(position.entry_price);
        tracker.update(position.symbol.clone(), price * position.quantity);
    }
    let notional_by_symbol: HashMap<Symbol, Decimal> =
        account.positions.keys().map(|symbol| (symbol.clone(), tracker.exposure(symbol))).collect();
    let total_notional: Decimal = notional_by_symbol.values().copied().sum();
    let equity = account.total_equity(prices);
    let leverage = if equity > Decimal::ZERO { total_notional / equity } else { Decimal::ZERO };
    ExposureSummary { notional_by_symbol, total_notional, equity, leverage }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use halyard_instrument::Position;
    use rust_decimal_macros::dec;

    fn account_with(symbol: &str, qty: Decimal, entry: Decimal, usdt: Decimal) -> Account {
        let mut account = Account::new(usdt, Utc::now());
        let position = Position::open_long(Symbol::from(symbol), qty, entry, Utc::now(), entry * dec!(0.9), entry * dec!(1.2)).unwrap();
        account.positions.insert(Symbol::from(symbol), position);
        account
    }

    #[test]
    fn leverage_is_zero_with_no_positions() {
        let account = Account::new(dec!(1000), Utc::now());
        let summary = summarize(&account, &HashMap::new());
        assert_eq!(summary.leverage, Decimal::ZERO);
        assert_eq!(summary.total_notional, Decimal::ZERO);
    }

    #[test]
    fn leverage_reflects_notional_over_equity() {
        let account = account_with("BTCUSDT", dec!(1), dec!(100), dec!(900));
        let mut prices = HashMap::new();
        prices.insert(Symbol::from("BTCUSDT"), dec!(100));
        let summary = summarize(&account, &prices);
        // equity = 900 cash + 100 notional = 1000; leverage = 100/1000
        assert_eq!(summary.equity, dec!(1000));
        assert_eq!(summary.leverage, dec!(0.1));
    }

    #[test]
    fn symbols_over_per_symbol_limit_are_flagged() {
        let account = account_with("BTCUSDT", dec!(5), dec!(100), dec!(500));
        let mut prices = HashMap::new();
        prices.insert(Symbol::from("BTCUSDT"), dec!(100));
        let summary = summarize(&account, &prices);
        // notional = 500, equity = 500 + 500 = 1000; limit at 0.3 => 300 < 500
        let over = symbols_over_limit(&summary, dec!(0.3));
        assert_eq!(over, vec![Symbol::from("BTCUSDT")]);
    }

    #[test]
    fn notional_exactly_at_the_limit_is_not_flagged() {
        let account = account_with("BTCUSDT", dec!(3), dec!(100), dec!(700));
        let mut prices = HashMap::new();
        prices.insert(Symbol::from("BTCUSDT"), dec!(100));
        let summary = summarize(&account, &prices);
        // notional = 300, equity = 700 + 300 = 1000; limit at 0.3 => exactly 300, not over
        let over = symbols_over_limit(&summary, dec!(0.3));
        assert!(over.is_empty());
    }

    #[test]
    fn missing_quote_falls_back_to_entry_price() {
        let account = account_with("ETHUSDT", dec!(2), dec!(50), dec!(900));
        let summary = summarize(&account, &HashMap::new());
        assert_eq!(summary.notional_by_symbol[&Symbol::from("ETHUSDT")], dec!(100));
    }
}
