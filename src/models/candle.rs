//! OHLC candle models.

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// A single OHLC bar for one time bucket of a trading pair.
///
/// Prices arrive either as JSON strings or numbers and are decoded into
/// [`Decimal`] either way.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candle {
    /// Bucket start as sent by the server. Orders candles within a topic.
    pub start: i64,
    /// Bucket time in seconds since the Unix epoch.
    #[serde(deserialize_with = "iso_to_unix_secs")]
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

fn iso_to_unix_secs<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.timestamp())
        .map_err(serde::de::Error::custom)
}

/// Payload of a `subscribe` acknowledgement for a candle topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SnapshotPayload {
    Candles(Vec<Candle>),
    Error { error: String },
}
