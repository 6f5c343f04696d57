//! Topic subscription and unsubscription operations.

use futures_util::SinkExt;
use tracing::{debug, info};
use tungstenite::Message;

use super::WsWriter;
use crate::Result;
use crate::models::{Topic, TopicRequest};

/// Subscribes to a topic (a candle topic or `markets`).
///
/// # Errors
///
/// Returns a [`FeedError`](crate::FeedError) if sending the subscription message fails.
pub async fn subscribe(write: &mut WsWriter, topic: &Topic) -> Result<()> {
    let json = serde_json::to_string(&TopicRequest::subscribe(topic))?;
    debug!("Sending subscribe request: {}", json);
    write.send(Message::Text(json.into())).await?;
    info!(%topic, "Subscribed to topic");

    Ok(())
}

/// Unsubscribes from a topic.
///
/// # Errors
///
/// Returns a [`FeedError`](crate::FeedError) if sending the unsubscribe message fails.
pub async fn unsubscribe(write: &mut WsWriter, topic: &Topic) -> Result<()> {
    let json = serde_json::to_string(&TopicRequest::unsubscribe(topic))?;
    write.send(Message::Text(json.into())).await?;
    info!(%topic, "Unsubscribed from topic");

    Ok(())
}
