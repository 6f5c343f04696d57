//! End-to-end test against a local WebSocket server.

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use tokio::net::TcpListener;
use tungstenite::Message;

use candlefeed::config::{AppConfig, EndpointMap, TimerConfig};
use candlefeed::models::{Period, TradingPair};
use candlefeed::websocket::MissedPongPolicy;
use candlefeed::{FeedEvent, MarketFeed};

use common::{btc_1m, candle_json};

const STEP: Duration = Duration::from_secs(5);

fn local_config(port: u16) -> AppConfig {
    AppConfig {
        endpoints: EndpointMap::with_default(format!("ws://127.0.0.1:{port}")),
        chain_id: None,
        pair: TradingPair::new("BTC", "USD"),
        period: Period::M1,
        timers: TimerConfig {
            ping_interval: Duration::from_secs(60),
            watchdog_interval: Duration::from_secs(60),
            stale_after: None,
        },
        missed_pong: MissedPongPolicy::Reconnect,
        ca_file: None,
    }
}

async fn next_text<S>(ws: &mut S) -> serde_json::Value
where
    S: futures_util::Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(STEP, ws.next())
            .await
            .expect("timed out waiting for client frame")
            .expect("client hung up")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("client sent invalid JSON");
        }
    }
}

#[tokio::test]
async fn test_subscribe_snapshot_update_and_teardown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        ws.send(Message::Text(r#"{"type":"connect"}"#.into()))
            .await
            .unwrap();

        let first = next_text(&mut ws).await;
        assert_eq!(first, serde_json::json!({"type": "subscribe", "topic": "markets"}));
        let second = next_text(&mut ws).await;
        assert_eq!(second, serde_json::json!({"type": "subscribe", "topic": "btc-usd:1m"}));

        let snapshot = serde_json::json!({
            "type": "subscribe",
            "topic": "btc-usd:1m",
            "data": [candle_json(100, "1"), candle_json(200, "2"), candle_json(300, "3")],
        });
        ws.send(Message::Text(snapshot.to_string().into()))
            .await
            .unwrap();

        let update = serde_json::json!({
            "type": "update",
            "topic": "btc-usd:1m",
            "data": candle_json(300, "3.5"),
        });
        ws.send(Message::Text(update.to_string().into()))
            .await
            .unwrap();

        let third = next_text(&mut ws).await;
        assert_eq!(third, serde_json::json!({"type": "unsubscribe", "topic": "btc-usd:1m"}));
        let fourth = next_text(&mut ws).await;
        assert_eq!(fourth, serde_json::json!({"type": "unsubscribe", "topic": "markets"}));
    });

    let (mut feed, mut events) = MarketFeed::spawn(&local_config(port)).unwrap();

    let candles = loop {
        let event = tokio::time::timeout(STEP, events.recv())
            .await
            .expect("timed out waiting for candles")
            .expect("feed stopped");
        if let FeedEvent::Candles { topic, candles } = event {
            assert_eq!(topic, btc_1m());
            if candles.last().map(|c| c.close) == Some(dec!(3.5)) {
                break candles;
            }
        }
    };

    assert_eq!(candles.len(), 3);
    assert_eq!(
        candles.iter().map(|c| c.start).collect::<Vec<_>>(),
        vec![100, 200, 300]
    );

    tokio::time::timeout(STEP, feed.shutdown())
        .await
        .expect("shutdown should complete");
    feed.shutdown().await;

    tokio::time::timeout(STEP, server)
        .await
        .expect("server should finish")
        .unwrap();

    assert!(
        feed.set_pair(TradingPair::new("ETH", "USD")).is_err(),
        "control channel should be closed after shutdown"
    );
}
