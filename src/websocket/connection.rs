//! WebSocket connection lifecycle management.
//!
//! [`ConnectionManager`] owns the single market-data socket. It handles
//! connecting, reading and classifying frames, liveness probing, automatic
//! reconnection with exponential backoff, and switching endpoints when the
//! active chain changes. It does not remember subscriptions: consumers must
//! rebuild them after every [`ConnectionEvent::Connected`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tungstenite::Message as WsMessage;

use super::handler::{FeedMessage, parse_message};
use super::liveness::{Liveness, MissedPongPolicy, PingDecision};
use super::{WsReader, WsWriter, connect, ping, subscribe, unsubscribe};
use crate::models::Topic;

/// Initial backoff duration between reconnection attempts.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum backoff duration between reconnection attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// A frame the consumer wants written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Subscribe(Topic),
    Unsubscribe(Topic),
}

/// Commands sent from the consumer to the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCommand {
    /// Write a frame on the current socket. Dropped while disconnected.
    Send(Outbound),
    /// Close the current socket and reconnect to a different URL.
    SwitchEndpoint(String),
    /// Close the socket and stop the manager.
    Close,
}

/// Events emitted by the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A socket is open; subscriptions must be re-issued.
    Connected,
    /// The socket was lost.
    Disconnected,
    /// A new connection attempt is starting.
    Reconnecting,
    /// A classified inbound frame.
    Message(FeedMessage),
}

/// Why the reader loop exited.
enum DisconnectReason {
    /// The connection was lost or errored.
    ConnectionError,
    /// The previous probe was never answered.
    PongTimeout,
    /// The consumer asked for a different endpoint.
    EndpointChanged,
    /// The consumer closed the feed or went away.
    Shutdown,
}

/// Manages the WebSocket connection lifecycle including reconnection
/// with exponential backoff and ping/pong liveness.
pub struct ConnectionManager {
    url: String,
    tls_config: Option<Arc<rustls::ClientConfig>>,
    ping_interval: Duration,
    liveness: Liveness,
    tx: mpsc::UnboundedSender<ConnectionEvent>,
    cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    #[must_use]
    pub fn new(
        url: String,
        tls_config: Option<Arc<rustls::ClientConfig>>,
        ping_interval: Duration,
        missed_pong: MissedPongPolicy,
        tx: mpsc::UnboundedSender<ConnectionEvent>,
        cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    ) -> Self {
        Self {
            url,
            tls_config,
            ping_interval,
            liveness: Liveness::new(missed_pong),
            tx,
            cmd_rx,
        }
    }

    /// Runs the connection manager loop until [`ConnectionCommand::Close`]
    /// is received or either channel is closed.
    pub async fn run(mut self) {
        let mut backoff = INITIAL_BACKOFF;
        let mut first_attempt = true;

        loop {
            if !first_attempt {
                let _ = self.tx.send(ConnectionEvent::Reconnecting);
            }
            first_attempt = false;

            info!(url = %self.url, "Connecting to WebSocket");
            let (write, read) = match connect(&self.url, self.tls_config.clone()).await {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Connection failed: {e}");
                    let _ = self.tx.send(ConnectionEvent::Disconnected);
                    info!(backoff_secs = backoff.as_secs(), "Backing off before retry");
                    if !self.wait_backoff(backoff).await {
                        return;
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            self.liveness.reset();
            if self.tx.send(ConnectionEvent::Connected).is_err() {
                return;
            }
            info!("WebSocket connected");

            // Reset backoff on successful connection
            backoff = INITIAL_BACKOFF;

            let reason = self.read_loop(write, read).await;

            match reason {
                DisconnectReason::EndpointChanged => {
                    let _ = self.tx.send(ConnectionEvent::Disconnected);
                    info!(url = %self.url, "Switching endpoint");
                }
                DisconnectReason::ConnectionError | DisconnectReason::PongTimeout => {
                    let _ = self.tx.send(ConnectionEvent::Disconnected);
                    info!(
                        backoff_secs = backoff.as_secs(),
                        "Connection lost, backing off"
                    );
                    if !self.wait_backoff(backoff).await {
                        return;
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                DisconnectReason::Shutdown => {
                    info!("Connection manager shutting down");
                    return;
                }
            }
        }
    }

    /// Sleeps for `backoff` while still honoring commands.
    ///
    /// Returns `false` if the manager should stop. An endpoint switch ends
    /// the wait early.
    async fn wait_backoff(&mut self, backoff: Duration) -> bool {
        let sleep = tokio::time::sleep(backoff);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(ConnectionCommand::Send(outbound)) => {
                        debug!(?outbound, "Dropping frame while disconnected");
                    }
                    Some(ConnectionCommand::SwitchEndpoint(url)) => {
                        self.url = url;
                        return true;
                    }
                    Some(ConnectionCommand::Close) | None => return false,
                }
            }
        }
    }

    /// Reads frames and writes commands until disconnection, endpoint
    /// change or shutdown.
    async fn read_loop(&mut self, mut write: WsWriter, mut read: WsReader) -> DisconnectReason {
        let mut ping_timer = tokio::time::interval_at(
            tokio::time::Instant::now() + self.ping_interval,
            self.ping_interval,
        );
        ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            match parse_message(text.as_str()) {
                                Some(FeedMessage::Pong) => {
                                    self.liveness.on_pong(Instant::now());
                                    debug!(rtt = ?self.liveness.last_round_trip(), "Received pong");
                                }
                                Some(message) => {
                                    if self.tx.send(ConnectionEvent::Message(message)).is_err() {
                                        let _ = write.close().await;
                                        return DisconnectReason::Shutdown;
                                    }
                                }
                                None => {}
                            }
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            warn!(?frame, "WebSocket closed by server");
                            return DisconnectReason::ConnectionError;
                        }
                        Some(Ok(_)) => {} // Binary/Ping/Pong frames
                        Some(Err(e)) => {
                            warn!("WebSocket error: {e}");
                            return DisconnectReason::ConnectionError;
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return DisconnectReason::ConnectionError;
                        }
                    }
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(ConnectionCommand::Send(outbound)) => {
                            let sent = match &outbound {
                                Outbound::Subscribe(topic) => subscribe(&mut write, topic).await,
                                Outbound::Unsubscribe(topic) => unsubscribe(&mut write, topic).await,
                            };
                            if let Err(e) = sent {
                                warn!(?outbound, "Failed to send frame: {e}");
                                return DisconnectReason::ConnectionError;
                            }
                        }
                        Some(ConnectionCommand::SwitchEndpoint(url)) => {
                            let _ = write.close().await;
                            self.url = url;
                            return DisconnectReason::EndpointChanged;
                        }
                        Some(ConnectionCommand::Close) | None => {
                            let _ = write.close().await;
                            return DisconnectReason::Shutdown;
                        }
                    }
                }

                _ = ping_timer.tick() => {
                    match self.liveness.on_ping_due(Instant::now()) {
                        PingDecision::SendPing => {
                            if self.liveness.missed() > 0 {
                                warn!(missed = self.liveness.missed(), "Pong not received, probing again");
                            }
                            if let Err(e) = ping(&mut write).await {
                                warn!("Ping failed: {e}");
                                return DisconnectReason::ConnectionError;
                            }
                        }
                        PingDecision::Unhealthy => {
                            warn!("Pong not received before next probe, reconnecting");
                            let _ = write.close().await;
                            return DisconnectReason::PongTimeout;
                        }
                    }
                }
            }
        }
    }
}
