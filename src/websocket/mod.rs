//! Async WebSocket client for the market-data socket.
//!
//! This module is organized by concern:
//! - [`connection`] - Socket lifecycle, reconnection and endpoint switching
//! - [`liveness`] - Ping/pong health tracking
//! - [`subscription`] - Topic subscribe/unsubscribe operations
//! - [`handler`] - Incoming message classification

pub mod connection;
mod handler;
mod liveness;
mod subscription;

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::{debug, info};
use tungstenite::Message;

use crate::Result;
use crate::models::PingRequest;

// Re-export submodule items at the module level for convenience
pub use connection::{ConnectionCommand, ConnectionEvent, ConnectionManager, Outbound};
pub use handler::{FeedMessage, parse_message};
pub use liveness::{Liveness, MissedPongPolicy, PingDecision};
pub use subscription::{subscribe, unsubscribe};

/// Write half of a market-data connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a market-data connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// With `tls_config` set, `wss://` connections trust only the roots it
/// contains; otherwise the bundled webpki roots are used.
///
/// # Errors
///
/// Returns a [`FeedError`](crate::FeedError) if the connection or TLS handshake fails.
pub async fn connect(
    url: &str,
    tls_config: Option<Arc<rustls::ClientConfig>>,
) -> Result<(WsWriter, WsReader)> {
    let connector = tls_config.map(Connector::Rustls);
    let (ws_stream, _) = connect_async_tls_with_config(url, None, false, connector).await?;
    info!(url, "WebSocket handshake completed");

    Ok(ws_stream.split())
}

/// Sends a liveness probe over the WebSocket.
///
/// # Errors
///
/// Returns a [`FeedError`](crate::FeedError) if sending the message fails.
pub async fn ping(write: &mut WsWriter) -> Result<()> {
    let request = PingRequest::new();
    let json = serde_json::to_string(&request)?;
    write.send(Message::Text(json.into())).await?;
    debug!("Sent ping");

    Ok(())
}
