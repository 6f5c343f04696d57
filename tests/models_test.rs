//! Topic construction and outbound frame serialization tests.

use candlefeed::models::{PingRequest, Period, Topic, TopicRequest, TradingPair};

#[test]
fn test_candle_topic_is_lower_case() {
    let pair = TradingPair::new("BTC", "USD");

    assert_eq!(Topic::candles(&pair, Period::M1).as_str(), "btc-usd:1m");
    assert_eq!(Topic::candles(&pair, Period::H4).as_str(), "btc-usd:4h");
}

#[test]
fn test_wire_topics_are_normalized() {
    let pair = TradingPair::new("eth", "usd");

    assert_eq!(Topic::from_wire(" ETH-USD:15M "), Topic::candles(&pair, Period::M15));
    assert!(Topic::from_wire("MARKETS").is_markets());
    assert!(!Topic::from_wire("btc-usd:1m").is_markets());
}

#[test]
fn test_trading_pair_parses_both_separators() {
    assert_eq!("BTC-USD".parse::<TradingPair>().unwrap(), TradingPair::new("BTC", "USD"));
    assert_eq!("ETH/USDC".parse::<TradingPair>().unwrap(), TradingPair::new("ETH", "USDC"));
    assert!("BTCUSD".parse::<TradingPair>().is_err());
    assert!("BTC-".parse::<TradingPair>().is_err());
}

#[test]
fn test_period_round_trips_through_wire_name() {
    for period in [
        Period::M1,
        Period::M5,
        Period::M15,
        Period::M30,
        Period::H1,
        Period::H4,
        Period::D1,
        Period::W1,
    ] {
        assert_eq!(period.as_str().parse::<Period>().unwrap(), period);
    }
    assert!("3m".parse::<Period>().is_err());
}

#[test]
fn test_subscribe_request_serializes() {
    let topic = Topic::candles(&TradingPair::new("BTC", "USD"), Period::M1);
    let request = TopicRequest::subscribe(&topic);

    let json = serde_json::to_string(&request).expect("Failed to serialize subscribe request");
    let value: serde_json::Value =
        serde_json::from_str(&json).expect("Failed to parse serialized JSON");

    assert_eq!(value["type"], "subscribe");
    assert_eq!(value["topic"], "btc-usd:1m");
}

#[test]
fn test_unsubscribe_request_serializes() {
    let request = TopicRequest::unsubscribe(&Topic::markets());

    let json = serde_json::to_string(&request).expect("Failed to serialize unsubscribe request");

    assert_eq!(json, r#"{"type":"unsubscribe","topic":"markets"}"#);
}

#[test]
fn test_ping_request_serializes() {
    let json = serde_json::to_string(&PingRequest::new()).expect("Failed to serialize ping");

    assert_eq!(json, r#"{"type":"ping"}"#);
}
