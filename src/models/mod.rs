//! Wire models for the market-data socket.
//!
//! Contains topic keys, candle and ticker payloads, and the outbound
//! request frames (subscribe, unsubscribe, ping).

pub mod candle;
pub mod ticker;
pub mod topic;

use serde::{Deserialize, Serialize};

pub use candle::Candle;
pub use ticker::MarketTicker;
pub use topic::{MARKETS_TOPIC, Period, Topic, TradingPair};

/// Discriminator carried in the `type` field of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    Connect,
    Subscribe,
    Unsubscribe,
    Update,
    Ping,
    Pong,
}

/// A `subscribe` or `unsubscribe` request for one topic.
#[derive(Debug, Serialize)]
pub struct TopicRequest {
    #[serde(rename = "type")]
    pub tpe: FrameType,
    pub topic: String,
}

impl TopicRequest {
    #[must_use]
    pub fn subscribe(topic: &Topic) -> Self {
        Self {
            tpe: FrameType::Subscribe,
            topic: topic.as_str().to_string(),
        }
    }

    #[must_use]
    pub fn unsubscribe(topic: &Topic) -> Self {
        Self {
            tpe: FrameType::Unsubscribe,
            topic: topic.as_str().to_string(),
        }
    }
}

/// Liveness probe; the server answers with `{"type":"pong"}`.
#[derive(Debug, Serialize)]
pub struct PingRequest {
    #[serde(rename = "type")]
    pub tpe: FrameType,
}

impl PingRequest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tpe: FrameType::Ping,
        }
    }
}

impl Default for PingRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Routing header shared by every inbound frame.
///
/// `data` is left as raw JSON because its shape depends on both the
/// frame type and the topic.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub tpe: FrameType,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}
