//! Incoming WebSocket message classification.

use tracing::debug;

use crate::models::candle::SnapshotPayload;
use crate::models::ticker::MarketsPayload;
use crate::models::{Candle, Envelope, FrameType, MarketTicker, Topic};

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Server greeting sent once per connection.
    Connect,
    /// Reply to a liveness probe.
    Pong,
    /// Subscription acknowledgement carrying the full candle history.
    Snapshot { topic: Topic, candles: Vec<Candle> },
    /// Subscription was refused by the server.
    SubscribeFailed { topic: Topic, error: String },
    /// The latest, possibly still-forming, candle for a topic.
    Update { topic: Topic, candle: Candle },
    /// Ticker summaries from the `markets` topic, either the initial
    /// acknowledgement or a later update.
    Markets(Vec<MarketTicker>),
}

/// Parses one text frame into a [`FeedMessage`].
///
/// Frames that are not JSON, carry an unknown `type`, lack a topic where
/// one is required, or whose `data` does not match the expected shape
/// are ignored and yield `None`.
pub fn parse_message(text: &str) -> Option<FeedMessage> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(error = %e, "Ignoring unrecognized frame");
            return None;
        }
    };

    match envelope.tpe {
        FrameType::Connect => Some(FeedMessage::Connect),
        FrameType::Pong => Some(FeedMessage::Pong),
        FrameType::Subscribe => handle_subscribe(envelope),
        FrameType::Update => handle_update(envelope),
        FrameType::Unsubscribe | FrameType::Ping => {
            debug!(msg_type = ?envelope.tpe, "Skipping frame");
            None
        }
    }
}

/// Splits a data-bearing envelope into its topic and payload.
fn topic_and_data(envelope: Envelope) -> Option<(Topic, serde_json::Value)> {
    match (envelope.topic, envelope.data) {
        (Some(topic), Some(data)) => Some((Topic::from_wire(&topic), data)),
        _ => {
            debug!(msg_type = ?envelope.tpe, "Frame missing topic or data");
            None
        }
    }
}

fn handle_subscribe(envelope: Envelope) -> Option<FeedMessage> {
    let (topic, data) = topic_and_data(envelope)?;

    if topic.is_markets() {
        return match serde_json::from_value(data) {
            Ok(MarketsPayload::Tickers(tickers)) => Some(FeedMessage::Markets(tickers)),
            Ok(MarketsPayload::Error { error }) => {
                Some(FeedMessage::SubscribeFailed { topic, error })
            }
            Err(e) => {
                debug!(%topic, error = %e, "Undecodable markets acknowledgement");
                None
            }
        };
    }

    match serde_json::from_value(data) {
        Ok(SnapshotPayload::Candles(candles)) => Some(FeedMessage::Snapshot { topic, candles }),
        Ok(SnapshotPayload::Error { error }) => Some(FeedMessage::SubscribeFailed { topic, error }),
        Err(e) => {
            debug!(%topic, error = %e, "Undecodable candle snapshot");
            None
        }
    }
}

fn handle_update(envelope: Envelope) -> Option<FeedMessage> {
    let (topic, data) = topic_and_data(envelope)?;

    if topic.is_markets() {
        return match serde_json::from_value::<Vec<MarketTicker>>(data) {
            Ok(tickers) => Some(FeedMessage::Markets(tickers)),
            Err(e) => {
                debug!(%topic, error = %e, "Undecodable markets update");
                None
            }
        };
    }

    match serde_json::from_value::<Candle>(data) {
        Ok(candle) => Some(FeedMessage::Update { topic, candle }),
        Err(e) => {
            debug!(%topic, error = %e, "Undecodable candle update");
            None
        }
    }
}
