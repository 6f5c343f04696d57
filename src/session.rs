//! Session driver tying the connection manager to the synchronizer.
//!
//! [`FeedSession`] owns all subscription and market state. It consumes
//! [`ConnectionEvent`]s, consumer [`FeedControl`] commands and watchdog
//! ticks, writes the resulting frames to the connection manager, and
//! publishes [`FeedEvent`]s for the consumer.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::EndpointMap;
use crate::models::{Candle, MarketTicker, Period, Topic, TradingPair};
use crate::store::MarketBoard;
use crate::sync::Synchronizer;
use crate::websocket::{ConnectionCommand, ConnectionEvent, FeedMessage, Outbound};

/// Commands from the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedControl {
    /// Select a different trading pair, keeping the period.
    SetPair(TradingPair),
    /// Select a different candle period, keeping the pair.
    SetPeriod(Period),
    /// Move to the endpoint of another chain.
    SwitchChain(Option<u64>),
    /// Unsubscribe everything and close the socket.
    Shutdown,
}

/// Connection state as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

/// Updates published to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connection(ConnectionStatus),
    /// The candle sequence for `topic` changed; carries the full sequence.
    Candles { topic: Topic, candles: Vec<Candle> },
    /// Ticker summaries that changed, in arrival order.
    Markets(Vec<MarketTicker>),
}

/// Owns the synchronizer, market board and endpoint selection for one feed.
pub struct FeedSession {
    sync: Synchronizer,
    markets: MarketBoard,
    endpoints: EndpointMap,
    chain_id: Option<u64>,
    pair: TradingPair,
    period: Period,
    commands: mpsc::UnboundedSender<ConnectionCommand>,
    events: mpsc::UnboundedSender<FeedEvent>,
    published_revision: u64,
    closed: bool,
}

impl FeedSession {
    /// Creates a session for the initial pair and period.
    ///
    /// `commands` is the connection manager's command channel and `events`
    /// the consumer's event channel.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        endpoints: EndpointMap,
        chain_id: Option<u64>,
        pair: TradingPair,
        period: Period,
        watchdog_interval: Duration,
        stale_after: Option<Duration>,
        commands: mpsc::UnboundedSender<ConnectionCommand>,
        events: mpsc::UnboundedSender<FeedEvent>,
    ) -> Self {
        let mut sync = Synchronizer::new(watchdog_interval, stale_after);
        // Not connected yet, so this only records the topic.
        let _ = sync.set_desired(Topic::candles(&pair, period), Instant::now());

        Self {
            sync,
            markets: MarketBoard::new(),
            endpoints,
            chain_id,
            pair,
            period,
            commands,
            events,
            published_revision: 0,
            closed: false,
        }
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn markets(&self) -> &MarketBoard {
        &self.markets
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Runs until a [`FeedControl::Shutdown`] arrives, the control channel
    /// closes, or the connection manager goes away.
    pub async fn run(
        mut self,
        mut connection: mpsc::UnboundedReceiver<ConnectionEvent>,
        mut control: mpsc::UnboundedReceiver<FeedControl>,
    ) {
        loop {
            let next_check = self.sync.next_check();
            let watchdog = async move {
                match next_check {
                    Some(at) => tokio::time::sleep_until(at.into()).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                event = connection.recv() => match event {
                    Some(event) => self.handle_connection_event(event, clock_now()),
                    None => {
                        warn!("Connection manager stopped");
                        break;
                    }
                },
                ctl = control.recv() => match ctl {
                    Some(FeedControl::Shutdown) | None => {
                        self.shutdown();
                        break;
                    }
                    Some(ctl) => self.handle_control(ctl, clock_now()),
                },
                () = watchdog => self.on_watchdog_tick(clock_now()),
            }
        }

        info!("Feed session stopped");
    }

    /// Applies one event from the connection manager.
    pub fn handle_connection_event(&mut self, event: ConnectionEvent, now: Instant) {
        match event {
            ConnectionEvent::Connected => {
                self.publish(FeedEvent::Connection(ConnectionStatus::Connected));
                let out = self.sync.on_connected(now);
                self.send_all(out);
            }
            ConnectionEvent::Disconnected => {
                self.sync.on_disconnected();
                self.publish(FeedEvent::Connection(ConnectionStatus::Disconnected));
            }
            ConnectionEvent::Reconnecting => {
                self.publish(FeedEvent::Connection(ConnectionStatus::Reconnecting));
            }
            ConnectionEvent::Message(FeedMessage::Markets(tickers)) => {
                debug!(count = tickers.len(), "Market tickers received");
                self.markets.apply(tickers.clone());
                self.publish(FeedEvent::Markets(tickers));
            }
            ConnectionEvent::Message(message) => {
                let out = self.sync.on_message(message, now);
                self.send_all(out);
                self.publish_candles_if_changed();
            }
        }
    }

    /// Applies one consumer command.
    pub fn handle_control(&mut self, control: FeedControl, now: Instant) {
        match control {
            FeedControl::SetPair(pair) => {
                self.pair = pair;
                self.retarget(now);
            }
            FeedControl::SetPeriod(period) => {
                self.period = period;
                self.retarget(now);
            }
            FeedControl::SwitchChain(chain_id) => {
                if chain_id == self.chain_id {
                    return;
                }
                let url = self.endpoints.resolve(chain_id).to_string();
                info!(?chain_id, %url, "Switching chain");
                self.chain_id = chain_id;
                self.markets.clear();
                self.command(ConnectionCommand::SwitchEndpoint(url));
            }
            FeedControl::Shutdown => self.shutdown(),
        }
    }

    /// Re-sends the subscription if it has not produced data within the
    /// watchdog interval, or went silent.
    pub fn on_watchdog_tick(&mut self, now: Instant) {
        let out = self.sync.on_watchdog_tick(now);
        self.send_all(out);
    }

    /// Unsubscribes the active topics and closes the socket.
    ///
    /// Calling this more than once has no further effect.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let out = self.sync.teardown();
        self.send_all(out);
        self.command(ConnectionCommand::Close);
    }

    fn retarget(&mut self, now: Instant) {
        let out = self
            .sync
            .set_desired(Topic::candles(&self.pair, self.period), now);
        self.send_all(out);
        self.publish_candles_if_changed();
    }

    fn publish_candles_if_changed(&mut self) {
        let store = self.sync.store();
        if store.revision() == self.published_revision {
            return;
        }
        self.published_revision = store.revision();

        if let Some(topic) = self.sync.desired() {
            let event = FeedEvent::Candles {
                topic: topic.clone(),
                candles: store.candles().to_vec(),
            };
            self.publish(event);
        }
    }

    fn send_all(&self, out: Vec<Outbound>) {
        for outbound in out {
            self.command(ConnectionCommand::Send(outbound));
        }
    }

    fn command(&self, command: ConnectionCommand) {
        if self.commands.send(command).is_err() {
            debug!("Connection manager gone, dropping command");
        }
    }

    fn publish(&self, event: FeedEvent) {
        if self.events.send(event).is_err() {
            debug!("Feed consumer gone, dropping event");
        }
    }
}

/// Current time on the runtime clock, which honors a paused test clock.
fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}
