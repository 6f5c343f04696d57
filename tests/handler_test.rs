//! Classification tests for inbound frames.

use rust_decimal_macros::dec;

use candlefeed::models::Topic;
use candlefeed::websocket::{FeedMessage, parse_message};

const CONNECT_JSON: &str = include_str!("fixtures/connect.json");
const SNAPSHOT_JSON: &str = include_str!("fixtures/snapshot.json");
const SUBSCRIBE_ERROR_JSON: &str = include_str!("fixtures/subscribe_error.json");
const UPDATE_JSON: &str = include_str!("fixtures/update.json");
const MARKETS_JSON: &str = include_str!("fixtures/markets.json");

#[test]
fn test_connect_frame_is_classified() {
    assert_eq!(parse_message(CONNECT_JSON), Some(FeedMessage::Connect));
}

#[test]
fn test_pong_frame_is_classified() {
    assert_eq!(parse_message(r#"{"type":"pong"}"#), Some(FeedMessage::Pong));
}

#[test]
fn test_snapshot_frame_decodes_candles_and_normalizes_topic() {
    let Some(FeedMessage::Snapshot { topic, candles }) = parse_message(SNAPSHOT_JSON) else {
        panic!("expected a snapshot");
    };

    assert_eq!(topic, Topic::from_wire("btc-usd:1m"));
    assert_eq!(topic.as_str(), "btc-usd:1m");
    assert_eq!(candles.len(), 3);

    let first = &candles[0];
    assert_eq!(first.start, 1_700_000_000_000);
    assert_eq!(first.time, 1_700_000_000);
    assert_eq!(first.open, dec!(36500.5));
    assert_eq!(first.high, dec!(36550));
    assert_eq!(first.low, dec!(36480.25));
    assert_eq!(first.close, dec!(36520));

    // numeric prices decode the same as string prices
    let second = &candles[1];
    assert_eq!(second.open, dec!(36520));
    assert_eq!(second.high, dec!(36600.75));
    assert_eq!(second.close, dec!(36590.5));

    // fractional seconds are truncated
    assert_eq!(candles[2].time, 1_700_000_120);
}

#[test]
fn test_subscribe_error_frame_is_classified() {
    let message = parse_message(SUBSCRIBE_ERROR_JSON);

    assert_eq!(
        message,
        Some(FeedMessage::SubscribeFailed {
            topic: Topic::from_wire("doge-usd:1m"),
            error: "unknown symbol".to_string(),
        })
    );
}

#[test]
fn test_update_frame_decodes_single_candle() {
    let Some(FeedMessage::Update { topic, candle }) = parse_message(UPDATE_JSON) else {
        panic!("expected an update");
    };

    assert_eq!(topic.as_str(), "btc-usd:1m");
    assert_eq!(candle.start, 1_700_000_120_000);
    assert_eq!(candle.close, dec!(36633.25));
}

#[test]
fn test_markets_update_decodes_tickers() {
    let Some(FeedMessage::Markets(tickers)) = parse_message(MARKETS_JSON) else {
        panic!("expected market tickers");
    };

    assert_eq!(tickers.len(), 2);

    let btc = &tickers[0];
    assert_eq!(btc.symbol, "BTC-USD");
    assert_eq!(btc.asset_type, "crypto");
    assert_eq!(btc.ret_24h_perc, dec!(2.35));
    assert_eq!(btc.current_px, dec!(36633.25));
    assert!(btc.is_open);
    assert_eq!(btc.next_open, None);

    let eur = &tickers[1];
    assert_eq!(eur.ret_24h_perc, dec!(-0.12));
    assert_eq!(eur.current_px, dec!(1.0712));
    assert!(!eur.is_open);
    assert_eq!(eur.next_open, Some(1_700_438_400_000));
    assert_eq!(eur.next_close, Some(1_700_870_400_000));
}

#[test]
fn test_markets_subscribe_ack_is_treated_as_tickers() {
    let json = r#"{
        "type": "subscribe",
        "topic": "markets",
        "data": [{"symbol": "ETH-USD", "assetType": "crypto", "ret24hPerc": 0, "currentPx": "2010.5", "isOpen": true}]
    }"#;

    let Some(FeedMessage::Markets(tickers)) = parse_message(json) else {
        panic!("expected market tickers");
    };
    assert_eq!(tickers[0].symbol, "ETH-USD");
    assert_eq!(tickers[0].next_close, None);
}

#[test]
fn test_markets_subscribe_error_is_classified() {
    let json = r#"{"type":"subscribe","topic":"markets","data":{"error":"busy"}}"#;

    assert_eq!(
        parse_message(json),
        Some(FeedMessage::SubscribeFailed {
            topic: Topic::markets(),
            error: "busy".to_string(),
        })
    );
}

#[test]
fn test_unrecognized_frames_are_ignored() {
    assert_eq!(parse_message("not json"), None);
    assert_eq!(parse_message(r#"{"type":"heartbeat"}"#), None);
    assert_eq!(parse_message(r#"{"topic":"btc-usd:1m"}"#), None);
    assert_eq!(parse_message(r#"{"type":"update","data":{}}"#), None);
    assert_eq!(parse_message(r#"{"type":"update","topic":"btc-usd:1m"}"#), None);
    assert_eq!(
        parse_message(r#"{"type":"update","topic":"btc-usd:1m","data":{"start":1}}"#),
        None
    );
    assert_eq!(
        parse_message(r#"{"type":"update","topic":"btc-usd:1m","data":{"start":1,"time":"yesterday","open":1,"high":1,"low":1,"close":1}}"#),
        None
    );
    assert_eq!(parse_message(r#"{"type":"unsubscribe","topic":"btc-usd:1m"}"#), None);
}
