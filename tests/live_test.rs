//! Live tests against the configured market-data endpoint.
//!
//! These tests require network access. The endpoint comes from the usual
//! `FEED_*` variables and falls back to the built-in default.
//! Run with: `cargo test --features integration-tests`

#![cfg(feature = "integration-tests")]

use std::time::Duration;

use futures_util::StreamExt;
use tungstenite::Message;

use candlefeed::config::{AppConfig, fetch_config};
use candlefeed::models::Topic;
use candlefeed::tls::build_tls_config;
use candlefeed::websocket::{
    FeedMessage, WsReader, connect, parse_message, ping, subscribe, unsubscribe,
};
use candlefeed::{FeedEvent, MarketFeed};

const WAIT: Duration = Duration::from_secs(15);

fn live_config() -> AppConfig {
    fetch_config().expect("FEED_* variables should be valid")
}

/// Reads frames until one classifies as a message accepted by `want`.
async fn wait_for<F>(read: &mut WsReader, want: F) -> FeedMessage
where
    F: Fn(&FeedMessage) -> bool,
{
    tokio::time::timeout(WAIT, async {
        while let Some(msg) = read.next().await {
            let Ok(Message::Text(text)) = msg else {
                continue;
            };
            if let Some(message) = parse_message(text.as_str()) {
                if want(&message) {
                    return message;
                }
            }
        }
        panic!("server closed the socket");
    })
    .await
    .expect("timed out waiting for a matching frame")
}

#[tokio::test]
async fn test_connect_to_market_data_socket() {
    let config = live_config();
    let tls = build_tls_config(config.ca_file.as_deref()).unwrap();

    let result = connect(config.websocket_url(), tls).await;
    assert!(result.is_ok(), "failed to connect to {}", config.websocket_url());
}

#[tokio::test]
async fn test_ping_pong() {
    let config = live_config();
    let tls = build_tls_config(config.ca_file.as_deref()).unwrap();
    let (mut write, mut read) = connect(config.websocket_url(), tls)
        .await
        .expect("failed to connect");

    ping(&mut write).await.expect("failed to send ping");

    let reply = wait_for(&mut read, |m| matches!(m, FeedMessage::Pong)).await;
    assert_eq!(reply, FeedMessage::Pong);
}

#[tokio::test]
async fn test_subscribe_and_receive_candle_snapshot() {
    let config = live_config();
    let tls = build_tls_config(config.ca_file.as_deref()).unwrap();
    let (mut write, mut read) = connect(config.websocket_url(), tls)
        .await
        .expect("failed to connect");
    let topic = Topic::candles(&config.pair, config.period);

    subscribe(&mut write, &topic)
        .await
        .expect("failed to subscribe");

    let snapshot = wait_for(&mut read, |m| {
        matches!(m, FeedMessage::Snapshot { .. } | FeedMessage::SubscribeFailed { .. })
    })
    .await;
    let FeedMessage::Snapshot { topic: acked, candles } = snapshot else {
        panic!("subscription rejected: {snapshot:?}");
    };
    assert_eq!(acked, topic);
    assert!(
        candles.windows(2).all(|w| w[0].start < w[1].start),
        "snapshot should be ordered by start"
    );

    unsubscribe(&mut write, &topic)
        .await
        .expect("failed to unsubscribe");
}

#[tokio::test]
async fn test_feed_publishes_markets_and_candles() {
    let config = live_config();
    let (mut feed, mut events) = MarketFeed::spawn(&config).expect("failed to start feed");

    let mut saw_markets = false;
    let mut saw_candles = false;
    let deadline = tokio::time::Instant::now() + WAIT;
    while !(saw_markets && saw_candles) {
        let event = tokio::time::timeout_at(deadline, events.recv())
            .await
            .expect("timed out waiting for feed events")
            .expect("feed stopped");
        match event {
            FeedEvent::Markets(tickers) => saw_markets |= !tickers.is_empty(),
            FeedEvent::Candles { candles, .. } => saw_candles |= !candles.is_empty(),
            FeedEvent::Connection(_) => {}
        }
    }

    feed.shutdown().await;
}
