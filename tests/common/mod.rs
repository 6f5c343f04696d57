//! Shared test utilities.

#![allow(dead_code)]

use rust_decimal::Decimal;

use candlefeed::models::{Candle, Period, Topic, TradingPair};

/// Builds a flat candle whose prices all equal `close`.
pub fn candle(start: i64, close: Decimal) -> Candle {
    Candle {
        start,
        time: start / 1000,
        open: close,
        high: close,
        low: close,
        close,
    }
}

pub fn btc_1m() -> Topic {
    Topic::candles(&TradingPair::new("BTC", "USD"), Period::M1)
}

pub fn eth_1m() -> Topic {
    Topic::candles(&TradingPair::new("ETH", "USD"), Period::M1)
}

/// Wire JSON for a candle at `start` with the given close.
pub fn candle_json(start: i64, close: &str) -> serde_json::Value {
    serde_json::json!({
        "start": start,
        "time": "2023-11-14T22:13:20Z",
        "open": close,
        "high": close,
        "low": close,
        "close": close,
    })
}
