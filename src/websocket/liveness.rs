//! Ping/pong liveness tracking for the market-data socket.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::FeedError;

/// What to do when a pong has not arrived by the time the next ping is due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissedPongPolicy {
    /// Tear the socket down and reconnect.
    #[default]
    Reconnect,
    /// Log, clear the flag and keep probing.
    Ignore,
}

impl FromStr for MissedPongPolicy {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reconnect" => Ok(Self::Reconnect),
            "ignore" => Ok(Self::Ignore),
            other => Err(FeedError::Config(format!(
                "unknown missed-pong policy `{other}`"
            ))),
        }
    }
}

impl fmt::Display for MissedPongPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconnect => f.write_str("reconnect"),
            Self::Ignore => f.write_str("ignore"),
        }
    }
}

/// Outcome of a ping tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingDecision {
    /// Send a probe now.
    SendPing,
    /// The previous probe went unanswered and the connection should be
    /// recreated.
    Unhealthy,
}

/// Tracks outstanding probes on a single connection.
#[derive(Debug)]
pub struct Liveness {
    policy: MissedPongPolicy,
    waiting_for_pong: bool,
    last_ping_at: Option<Instant>,
    last_pong_at: Option<Instant>,
    missed: u32,
}

impl Liveness {
    #[must_use]
    pub fn new(policy: MissedPongPolicy) -> Self {
        Self {
            policy,
            waiting_for_pong: false,
            last_ping_at: None,
            last_pong_at: None,
            missed: 0,
        }
    }

    /// Called when the ping interval fires.
    ///
    /// Arms the waiting flag when a probe should be sent. Under
    /// [`MissedPongPolicy::Ignore`] a missed pong is counted and probing
    /// continues.
    pub fn on_ping_due(&mut self, now: Instant) -> PingDecision {
        if self.waiting_for_pong {
            self.missed += 1;
            if self.policy == MissedPongPolicy::Reconnect {
                return PingDecision::Unhealthy;
            }
        }

        self.waiting_for_pong = true;
        self.last_ping_at = Some(now);
        PingDecision::SendPing
    }

    /// Called for every inbound pong frame.
    pub fn on_pong(&mut self, now: Instant) {
        self.waiting_for_pong = false;
        self.last_pong_at = Some(now);
        self.missed = 0;
    }

    /// Forgets all probe state; used when a new socket is opened.
    pub fn reset(&mut self) {
        self.waiting_for_pong = false;
        self.last_ping_at = None;
        self.last_pong_at = None;
        self.missed = 0;
    }

    pub fn is_waiting_for_pong(&self) -> bool {
        self.waiting_for_pong
    }

    /// Consecutive probes that went unanswered.
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// Round-trip time of the last answered probe.
    pub fn last_round_trip(&self) -> Option<std::time::Duration> {
        match (self.last_ping_at, self.last_pong_at) {
            (Some(ping), Some(pong)) if pong >= ping => Some(pong - ping),
            _ => None,
        }
    }
}
