//! Subscription synchronizer.
//!
//! [`Synchronizer`] keeps the socket's topic subscriptions consistent with
//! the externally selected trading pair and period, recovers from dropped
//! acknowledgements and stale streams, and feeds accepted candle data into
//! its [`CandleStore`].
//!
//! It performs no I/O. Every input returns the [`Outbound`] frames that
//! should be written, in order, so the same state machine can be driven by
//! the live session or by tests.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::models::Topic;
use crate::store::{CandleStore, UpdateOutcome};
use crate::websocket::{FeedMessage, Outbound};

/// Lifecycle of the candle subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// No socket.
    Disconnected,
    /// Socket open, no candle topic requested.
    Connected,
    /// First subscription to a topic is awaiting data.
    Subscribing(Topic),
    /// Data for the topic is flowing.
    Subscribed(Topic),
    /// A topic change, watchdog or staleness check re-issued the
    /// subscription and fresh data is awaited.
    Resubscribing(Topic),
}

/// Drives subscribe/unsubscribe decisions for one socket.
#[derive(Debug)]
pub struct Synchronizer {
    state: SyncState,
    desired: Option<Topic>,
    markets_subscribed: bool,
    handshake_complete: bool,
    subscribed_at: Option<Instant>,
    last_data_at: Option<Instant>,
    watchdog_interval: Duration,
    stale_after: Option<Duration>,
    watchdog_attempts: u32,
    store: CandleStore,
}

impl Synchronizer {
    /// Creates a disconnected synchronizer.
    ///
    /// A subscription that has produced no data `watchdog_interval` after
    /// it was sent is sent again. With `stale_after` set, a subscribed topic
    /// that stays silent for that long is re-subscribed as well.
    #[must_use]
    pub fn new(watchdog_interval: Duration, stale_after: Option<Duration>) -> Self {
        Self {
            state: SyncState::Disconnected,
            desired: None,
            markets_subscribed: false,
            handshake_complete: false,
            subscribed_at: None,
            last_data_at: None,
            watchdog_interval,
            stale_after,
            watchdog_attempts: 0,
            store: CandleStore::new(),
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// The topic the consumer wants candles for.
    pub fn desired(&self) -> Option<&Topic> {
        self.desired.as_ref()
    }

    /// The candle topic currently subscribed on the socket.
    pub fn active(&self) -> Option<&Topic> {
        match &self.state {
            SyncState::Subscribing(topic)
            | SyncState::Subscribed(topic)
            | SyncState::Resubscribing(topic) => Some(topic),
            SyncState::Disconnected | SyncState::Connected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state != SyncState::Disconnected
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub fn markets_subscribed(&self) -> bool {
        self.markets_subscribed
    }

    /// `true` once the server's `connect` greeting has been seen on the
    /// current socket.
    pub fn handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    pub fn store(&self) -> &CandleStore {
        &self.store
    }

    /// Watchdog re-subscriptions sent since the topic last became ready.
    pub fn watchdog_attempts(&self) -> u32 {
        self.watchdog_attempts
    }

    /// When the watchdog next needs to look at the subscription, if at all.
    ///
    /// While data is awaited this is one watchdog interval after the last
    /// subscribe. Once data flows it is the staleness deadline, if enabled.
    pub fn next_check(&self) -> Option<Instant> {
        self.active()?;
        if !self.store.is_ready() {
            return self.subscribed_at.map(|at| at + self.watchdog_interval);
        }
        match (self.stale_after, self.last_data_at) {
            (Some(limit), Some(last)) => Some(last + limit),
            _ => None,
        }
    }

    /// The socket opened. Nothing survives a reconnect server-side, so the
    /// `markets` topic and the desired candle topic are subscribed afresh.
    pub fn on_connected(&mut self, now: Instant) -> Vec<Outbound> {
        let mut out = Vec::new();
        self.state = SyncState::Connected;
        self.handshake_complete = false;
        self.watchdog_attempts = 0;

        if !self.markets_subscribed {
            out.push(Outbound::Subscribe(Topic::markets()));
            self.markets_subscribed = true;
        }

        if let Some(topic) = self.desired.clone() {
            self.store.mark_stale();
            out.push(Outbound::Subscribe(topic.clone()));
            self.state = SyncState::Subscribing(topic);
            self.subscribed_at = Some(now);
        }

        out
    }

    /// The socket was lost; all server-side subscriptions are gone.
    pub fn on_disconnected(&mut self) {
        self.state = SyncState::Disconnected;
        self.markets_subscribed = false;
        self.handshake_complete = false;
        self.subscribed_at = None;
        self.store.mark_stale();
    }

    /// The selected pair or period changed.
    ///
    /// While connected this unsubscribes the previous topic (if any) and
    /// subscribes the new one. Setting the current topic again is a no-op.
    pub fn set_desired(&mut self, topic: Topic, now: Instant) -> Vec<Outbound> {
        if self.desired.as_ref() == Some(&topic) {
            return Vec::new();
        }

        info!(%topic, previous = ?self.desired.as_ref().map(Topic::as_str), "Desired topic changed");
        self.desired = Some(topic.clone());
        self.store.reset();
        self.last_data_at = None;
        self.subscribed_at = None;
        self.watchdog_attempts = 0;

        if !self.is_connected() {
            return Vec::new();
        }

        let mut out = Vec::new();
        let next_state = match self.active().cloned() {
            Some(previous) => {
                out.push(Outbound::Unsubscribe(previous));
                SyncState::Resubscribing(topic.clone())
            }
            None => SyncState::Subscribing(topic.clone()),
        };
        out.push(Outbound::Subscribe(topic));
        self.state = next_state;
        self.subscribed_at = Some(now);
        out
    }

    /// Checks for a subscription that produced no data within the watchdog
    /// interval of being sent, or one that went silent.
    pub fn on_watchdog_tick(&mut self, now: Instant) -> Vec<Outbound> {
        let Some(topic) = self.active().cloned() else {
            return Vec::new();
        };

        if !self.store.is_ready() {
            let due = self
                .subscribed_at
                .is_none_or(|at| now.saturating_duration_since(at) >= self.watchdog_interval);
            if !due {
                return Vec::new();
            }
            self.watchdog_attempts += 1;
            self.subscribed_at = Some(now);
            warn!(%topic, attempts = self.watchdog_attempts, "No candle data yet, resubscribing");
            return vec![Outbound::Subscribe(topic)];
        }

        let stale = match (self.stale_after, self.last_data_at) {
            (Some(limit), Some(last)) => now.saturating_duration_since(last) >= limit,
            _ => false,
        };
        if stale {
            warn!(%topic, "Candle stream went silent, resubscribing");
            self.store.mark_stale();
            self.watchdog_attempts += 1;
            self.subscribed_at = Some(now);
            self.state = SyncState::Resubscribing(topic.clone());
            return vec![Outbound::Subscribe(topic)];
        }

        Vec::new()
    }

    /// Applies one classified inbound message.
    ///
    /// Data for any candle topic other than the desired one is discarded
    /// and answered with a single unsubscribe for that topic.
    pub fn on_message(&mut self, message: FeedMessage, now: Instant) -> Vec<Outbound> {
        match message {
            FeedMessage::Connect => {
                self.handshake_complete = true;
                debug!("Server handshake complete");
                Vec::new()
            }
            FeedMessage::Pong | FeedMessage::Markets(_) => Vec::new(),
            FeedMessage::SubscribeFailed { topic, error } => {
                warn!(%topic, error = %error, "Subscription rejected");
                if topic.is_markets() {
                    self.markets_subscribed = false;
                }
                Vec::new()
            }
            FeedMessage::Snapshot { topic, candles } => {
                if let Some(stray) = self.stray(&topic) {
                    return stray;
                }
                let received = candles.len();
                let dropped = self.store.apply_snapshot(candles);
                info!(%topic, received, dropped, "Applied candle snapshot");
                self.mark_fresh(now);
                Vec::new()
            }
            FeedMessage::Update { topic, candle } => {
                if let Some(stray) = self.stray(&topic) {
                    return stray;
                }
                let outcome = self.store.apply_update(candle);
                debug!(%topic, ?outcome, "Applied candle update");
                if outcome != UpdateOutcome::Rejected {
                    self.mark_fresh(now);
                }
                Vec::new()
            }
        }
    }

    /// Frames to send before the socket is closed for good.
    pub fn teardown(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        if self.is_connected() {
            if let Some(topic) = self.active().cloned() {
                out.push(Outbound::Unsubscribe(topic));
            }
            if self.markets_subscribed {
                out.push(Outbound::Unsubscribe(Topic::markets()));
            }
        }
        self.on_disconnected();
        out
    }

    fn stray(&self, topic: &Topic) -> Option<Vec<Outbound>> {
        if topic.is_markets() || self.desired.as_ref() == Some(topic) {
            return None;
        }
        debug!(%topic, desired = ?self.desired.as_ref().map(Topic::as_str), "Unsubscribing stray topic");
        Some(vec![Outbound::Unsubscribe(topic.clone())])
    }

    fn mark_fresh(&mut self, now: Instant) {
        self.last_data_at = Some(now);
        self.watchdog_attempts = 0;
        if let Some(topic) = self.active().cloned() {
            self.state = SyncState::Subscribed(topic);
        }
    }
}
