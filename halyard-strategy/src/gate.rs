use halyard_instrument::{Market, SignalType};

/// Per-tick evaluation of the three directional rule sets (buy/short open, sell/cover close),
/// already reduced to booleans by [`crate::rule::evaluate_all`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleFires {
    pub buy: bool,
    pub short: bool,
    pub sell: bool,
    pub cover: bool,
}

/// Selects the signal type reachable given the current position side, closing the class of bugs
/// where opposite-direction rule sets mutually mask each other (SPEC_FULL.md §4.4 item 2).
///
/// - No position → evaluate buy and short; buy wins ties.
/// - Long held → only sell is reachable.
/// - Short held → only cover is reachable.
/// - Short/cover are unreachable on a [`Market`] that doesn't support short (SPEC_FULL Open
///   Question 4): the short fire is simply treated as not fired.
pub fn gate(fires: RuleFires, position_side: Option<halyard_instrument::Side>, market: Market) -> SignalType {
    match position_side {
        None => {
            if fires.buy {
                SignalType::Buy
            } else if fires.short && market.supports_short() {
                SignalType::Short
            } else {
                SignalType::None
            }
        }
        Some(halyard_instrument::Side::Long) => {
            if fires.sell {
                SignalType::Sell
            } else {
                SignalType::None
            }
        }
        Some(halyard_instrument::Side::Short) => {
            if fires.cover {
                SignalType::Cover
            } else {
                SignalType::None
            }
        }
    }
}
