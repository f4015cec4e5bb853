use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Trading pair identifier (eg/ `"BTCUSDT"`).
///
/// Backed by [`SmolStr`] so cloning a [`Symbol`] around the signal pipeline and exit engine is
/// cheap — symbols are inlined rather than heap-allocated for anything under 23 bytes.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, Display,
)]
#[serde(transparent)]
pub struct Symbol(SmolStr);

impl Symbol {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Candlestick timeframe (eg/ `1h`, `15m`), used to key the [`crate::Kline`] cache.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Constructor, Display)]
#[serde(transparent)]
pub struct Timeframe(SmolStr);

impl Timeframe {
    pub fn m1() -> Self {
        Self(SmolStr::new_static("1m"))
    }
    pub fn m15() -> Self {
        Self(SmolStr::new_static("15m"))
    }
    pub fn h1() -> Self {
        Self(SmolStr::new_static("1h"))
    }
    pub fn h4() -> Self {
        Self(SmolStr::new_static("4h"))
    }
    pub fn d1() -> Self {
        Self(SmolStr::new_static("1d"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Timeframe {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}
