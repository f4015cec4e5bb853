use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Directional side of a held [`crate::Position`].
///
/// Absent in legacy persisted records — [`Side::default`] is `Long` so old snapshots deserialize
/// without a migration step (SPEC_FULL.md §9, "Legacy `side` fallback").
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Display, Default)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

/// Side of an order submitted to the exchange. Distinct from [`Side`] (a position's direction)
/// because closing a short is a `Buy` order and closing a long is a `Sell` order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_side_is_long() {
        assert_eq!(Side::default(), Side::Long);
    }

    #[test]
    fn legacy_record_without_side_defaults_long() {
        let value: Side = serde_json::from_str("null").unwrap_or_default();
        assert_eq!(value, Side::Long);
    }
}
