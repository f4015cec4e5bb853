use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifies the execution venue a [`crate::Symbol`] is quoted and traded on.
///
/// An execution venue may expose distinct APIs per market kind (eg/ Binance spot vs USD-M
/// futures), so each combination is its own variant rather than a single `Binance` enum member.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeId {
    BinanceSpot,
    BinanceFuturesUsd,
    BybitSpot,
    BybitPerpetualsUsd,
    Okx,
    /// Paper/backtest venue: no orders ever leave the process.
    Simulated,
    /// Exchange testnet, reached through the same [`crate::ExchangeClient`]-shaped adapter as
    /// the live venue but against sandboxed credentials.
    Testnet,
}

/// Market a scenario trades on, gating which [`crate::Side`]s are reachable (spot has no short
/// side, see SPEC_FULL.md Open Question 4).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Display, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    #[default]
    Spot,
    Futures,
    Margin,
}

impl Market {
    /// Spot markets cannot hold a short position; short/cover signals are unreachable there.
    pub fn supports_short(&self) -> bool {
        !matches!(self, Market::Spot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_does_not_support_short() {
        assert!(!Market::Spot.supports_short());
        assert!(Market::Futures.supports_short());
        assert!(Market::Margin.supports_short());
    }
}
