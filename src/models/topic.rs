//! Subscription topics and the pieces they are built from.

use std::fmt;
use std::str::FromStr;

use crate::error::FeedError;

/// Wire name of the fixed ticker-summary topic.
pub const MARKETS_TOPIC: &str = "markets";

/// Candle aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
}

impl Period {
    /// Returns the wire-format period suffix used in candle topics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::M1 => "1m",
            Period::M5 => "5m",
            Period::M15 => "15m",
            Period::M30 => "30m",
            Period::H1 => "1h",
            Period::H4 => "4h",
            Period::D1 => "1d",
            Period::W1 => "1w",
        }
    }
}

impl FromStr for Period {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Period::M1),
            "5m" => Ok(Period::M5),
            "15m" => Ok(Period::M15),
            "30m" => Ok(Period::M30),
            "1h" => Ok(Period::H1),
            "4h" => Ok(Period::H4),
            "1d" => Ok(Period::D1),
            "1w" => Ok(Period::W1),
            other => Err(FeedError::InvalidTopic(format!("unknown period `{other}`"))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A base/quote currency pair, e.g. `BTC-USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl FromStr for TradingPair {
    type Err = FeedError;

    /// Accepts `BASE-QUOTE` or `BASE/QUOTE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .trim()
            .split_once(['-', '/'])
            .ok_or_else(|| FeedError::InvalidTopic(format!("trading pair `{s}` has no separator")))?;

        if base.is_empty() || quote.is_empty() {
            return Err(FeedError::InvalidTopic(format!(
                "trading pair `{s}` is missing a currency"
            )));
        }

        Ok(Self::new(base, quote))
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

/// A normalized subscription key on the market-data socket.
///
/// Candle topics have the form `<base>-<quote>:<period>` and are always
/// lower-case, so topics echoed back by the server compare equal to the
/// ones we sent regardless of casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Builds the candle topic for a pair and period.
    #[must_use]
    pub fn candles(pair: &TradingPair, period: Period) -> Self {
        Self(format!("{pair}:{period}").to_ascii_lowercase())
    }

    /// The fixed ticker-summary topic.
    #[must_use]
    pub fn markets() -> Self {
        Self(MARKETS_TOPIC.to_string())
    }

    /// Normalizes a topic string received from the wire.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        Self(raw.trim().to_ascii_lowercase())
    }

    #[must_use]
    pub fn is_markets(&self) -> bool {
        self.0 == MARKETS_TOPIC
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
