use halyard_instrument::Symbol;
use halyard_risk::{CorrelationHeat, KellyCalculator, TradeOutcome};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Optional ATR-based sizing: stop distance = `atr * multiplier`, quantity = `(equity *
/// risk_per_trade) / stop_distance`, capped at `max_position_ratio` of equity.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AtrSizing {
    pub multiplier: Decimal,
    pub risk_per_trade: Decimal,
    pub max_position_ratio: Decimal,
}

impl AtrSizing {
    pub fn quantity(&self, equity: Decimal, price: Decimal, atr: Decimal) -> Decimal {
        let stop_distance = atr * self.multiplier;
        if stop_distance <= Decimal::ZERO || price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let risk_budget = equity * self.risk_per_trade;
        let quantity = risk_budget / stop_distance;
        let max_quantity = (equity * self.max_position_ratio) / price;
        quantity.min(max_quantity).max(Decimal::ZERO)
    }
}

/// Inputs the sizing stage needs beyond the base config ratio (SPEC_FULL.md §4.4 item 6).
#[derive(Debug, Clone)]
pub struct SizingContext<'a> {
    pub kelly: Option<&'a KellyCalculator>,
    pub closed_outcomes: &'a [TradeOutcome],
    pub atr_sizing: Option<&'a AtrSizing>,
    pub atr: Option<Decimal>,
    pub correlation_heat: Option<&'a CorrelationHeat>,
    pub held_symbols: &'a [(Symbol, Vec<Decimal>)],
}

/// Final position ratio after composing Kelly sizing, ATR-derived sizing and the portfolio
/// correlation-heat scaler on top of the regime/event-adjusted base ratio.
pub fn position_ratio(
    base_ratio: Decimal,
    equity: Decimal,
    price: Decimal,
    candidate: &(Symbol, Vec<Decimal>),
    ctx: &SizingContext<'_>,
) -> Decimal {
    let mut ratio = base_ratio;

    if let Some(kelly) = ctx.kelly {
        ratio = kelly.position_ratio(ctx.closed_outcomes, ratio);
    }

    if let (Some(sizing), Some(atr)) = (ctx.atr_sizing, ctx.atr) {
        if atr > Decimal::ZERO && price > Decimal::ZERO && equity > Decimal::ZERO {
            let quantity = sizing.quantity(equity, price, atr);
            let atr_ratio = (quantity * price) / equity;
            ratio = ratio.min(atr_ratio).min(sizing.max_position_ratio);
        }
    }

    if let Some(heat) = ctx.correlation_heat {
        let assessment = heat.assess(ctx.held_symbols, candidate, ratio);
        ratio = assessment.adjusted_ratio;
    }

    ratio.max(Decimal::ZERO)
}
