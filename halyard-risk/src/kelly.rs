use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of one closed signal, as replayed from signal history: whether it won and its
/// realised return as a fraction of entry notional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeOutcome {
    pub won: bool,
    pub return_fraction: Decimal,
}

/// Fractional-Kelly position sizer, clamped to a configured `[min, max]` ratio band.
///
/// Falls back to a caller-supplied default ratio when the closed-signal sample is too small to
/// estimate win rate / payoff ratio reliably (SPEC_FULL.md §4.4 item 6).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct KellyCalculator {
    /// Fraction of full Kelly actually risked (0.5 = half-Kelly).
    pub fractional: Decimal,
    pub min_ratio: Decimal,
    pub max_ratio: Decimal,
    pub min_sample_size: usize,
}

impl KellyCalculator {
    /// Computes the position ratio to use, given recent closed-signal outcomes and a fallback
    /// ratio for when `outcomes.len() < min_sample_size`.
    pub fn position_ratio(&self, outcomes: &[TradeOutcome], fallback_ratio: Decimal) -> Decimal {
        if outcomes.len() < self.min_sample_size {
            return fallback_ratio;
        }

        let n = Decimal::from(outcomes.len() as u64);
        let wins: Vec<&TradeOutcome> = outcomes.iter().filter(|o| o.won).collect();
        let losses: Vec<&TradeOutcome> = outcomes.iter().filter(|o| !o.won).collect();

        if wins.is_empty() || losses.is_empty() {
            return fallback_ratio;
        }

        let win_rate = Decimal::from(wins.len() as u64) / n;
        let avg_win = wins.iter().map(|o| o.return_fraction).sum::<Decimal>() / Decimal::from(wins.len() as u64);
        let avg_loss = losses.iter().map(|o| o.return_fraction.abs()).sum::<Decimal>()
            / Decimal::from(losses.len() as u64);

        if avg_loss.is_zero() {
            return fallback_ratio;
        }

        let payoff_ratio = avg_win / avg_loss;
        let loss_rate = Decimal::ONE - win_rate;
        let kelly = win_rate - loss_rate / payoff_ratio;

        let sized = (kelly * self.fractional).max(Decimal::ZERO);
        sized.clamp(self.min_ratio, self.max_ratio)
    }
}
