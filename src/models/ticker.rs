//! Ticker summaries carried on the `markets` topic.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Summary of one tradable symbol.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTicker {
    pub symbol: String,
    pub asset_type: String,
    /// 24h return in percent.
    #[serde(rename = "ret24hPerc")]
    pub ret_24h_perc: Decimal,
    pub current_px: Decimal,
    pub is_open: bool,
    /// Next session open (epoch millis) for symbols with trading hours.
    #[serde(default)]
    pub next_open: Option<i64>,
    #[serde(default)]
    pub next_close: Option<i64>,
}

/// Payload of a `subscribe` acknowledgement for the `markets` topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MarketsPayload {
    Tickers(Vec<MarketTicker>),
    Error { error: String },
}
