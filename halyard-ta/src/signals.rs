use crate::patterns::{crossover, Cross};
use rust_decimal::Decimal;

/// Directional signal derived from a crossover between two series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
}

/// Stateful fast/slow crossover detector: feeds each `(fast, slow)` pair into
/// [`crate::patterns::crossover`] against the previous pair and maps the result onto a
/// [`Signal`].
#[derive(Debug, Clone, Default)]
pub struct CrossOverSignal {
    prev: Option<(Decimal, Decimal)>,
}

impl CrossOverSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, fast: Decimal, slow: Decimal) -> Option<Signal> {
        let result = match self.prev {
            Some((prev_fast, prev_slow)) => crossover(prev_fast, prev_slow, fast, slow),
            None => None,
        };
        self.prev = Some((fast, slow));
        match result {
            Some(Cross::Above) => Some(Signal::Buy),
            Some(Cross::Below) => Some(Signal::Sell),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn generates_buy_and_sell_on_crossover() {
        let mut gen = CrossOverSignal::new();
        assert_eq!(gen.update(dec!(1), dec!(2)), None);
        assert_eq!(gen.update(dec!(2), dec!(2)), None);
        assert_eq!(gen.update(dec!(3), dec!(2)), Some(Signal::Buy));
        assert_eq!(gen.update(dec!(2), dec!(3)), Some(Signal::Sell));
    }
}
