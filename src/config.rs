//! Application configuration loaded from environment variables.
//!
//! All variables are optional:
//! - `FEED_WEBSOCKET_URL` overrides the `default` endpoint
//! - `FEED_ENDPOINTS_FILE` points at a JSON object mapping chain ids to URLs
//! - `FEED_CHAIN_ID` selects the active chain
//! - `FEED_PAIR` / `FEED_PERIOD` select the initial candle topic
//! - `FEED_PING_SECS`, `FEED_WATCHDOG_SECS`, `FEED_STALE_SECS` tune timers
//! - `FEED_MISSED_PONG` is `reconnect` or `ignore`
//! - `FEED_CA_FILE` pins the TLS root to a PEM file

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::FeedError;
use crate::models::{Period, TradingPair};
use crate::websocket::MissedPongPolicy;

/// Default public WebSocket endpoint.
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://market-data.perps.exchange/ws";

/// Key used for the fallback entry of an [`EndpointMap`].
pub const DEFAULT_ENDPOINT_KEY: &str = "default";

const DEFAULT_PAIR: &str = "BTC-USD";
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(5);

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoints: EndpointMap,
    pub chain_id: Option<u64>,
    pub pair: TradingPair,
    pub period: Period,
    pub timers: TimerConfig,
    pub missed_pong: MissedPongPolicy,
    pub ca_file: Option<PathBuf>,
}

impl AppConfig {
    /// URL for the configured chain, falling back to the default entry.
    pub fn websocket_url(&self) -> &str {
        self.endpoints.resolve(self.chain_id)
    }
}

/// Intervals driving the liveness probe and the subscription watchdog.
#[derive(Debug, Clone, Copy)]
pub struct TimerConfig {
    pub ping_interval: Duration,
    pub watchdog_interval: Duration,
    /// Resubscribe when a ready topic has been silent this long.
    pub stale_after: Option<Duration>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            stale_after: None,
        }
    }
}

/// WebSocket endpoints keyed by chain id, with a `default` fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "HashMap<String, String>")]
pub struct EndpointMap {
    default: String,
    chains: HashMap<u64, String>,
}

impl EndpointMap {
    /// A map containing only a default endpoint.
    #[must_use]
    pub fn with_default(url: impl Into<String>) -> Self {
        Self {
            default: url.into(),
            chains: HashMap::new(),
        }
    }

    /// Adds or replaces the endpoint for a chain.
    #[must_use]
    pub fn with_chain(mut self, chain_id: u64, url: impl Into<String>) -> Self {
        self.chains.insert(chain_id, url.into());
        self
    }

    /// Returns the endpoint for `chain_id`, or the default when the chain
    /// is unknown or unset.
    pub fn resolve(&self, chain_id: Option<u64>) -> &str {
        chain_id
            .and_then(|id| self.chains.get(&id))
            .map_or(self.default.as_str(), String::as_str)
    }

    /// Loads an endpoint map from a JSON file such as
    /// `{"default": "wss://...", "42161": "wss://..."}`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] if the file cannot be read, and
    /// [`FeedError::Json`] if it is not a valid endpoint map.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FeedError::Config(format!("failed to read {}: {e}", path.display())))?;
        let map: Self = serde_json::from_str(&contents)?;
        Ok(map)
    }

    fn set_default(&mut self, url: String) {
        self.default = url;
    }
}

impl TryFrom<HashMap<String, String>> for EndpointMap {
    type Error = String;

    fn try_from(mut raw: HashMap<String, String>) -> Result<Self, Self::Error> {
        let default = raw
            .remove(DEFAULT_ENDPOINT_KEY)
            .ok_or_else(|| format!("endpoint map has no `{DEFAULT_ENDPOINT_KEY}` entry"))?;

        let chains = raw
            .into_iter()
            .map(|(key, url)| {
                key.parse::<u64>()
                    .map(|id| (id, url))
                    .map_err(|_| format!("endpoint key `{key}` is not a chain id"))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { default, chains })
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`FeedError::Config`](crate::FeedError::Config) if a variable is
/// set but cannot be parsed, or the endpoint file cannot be loaded.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let mut endpoints = match non_empty_var("FEED_ENDPOINTS_FILE") {
        Some(path) => EndpointMap::load(Path::new(&path))?,
        None => EndpointMap::with_default(DEFAULT_WEBSOCKET_URL),
    };
    if let Some(url) = non_empty_var("FEED_WEBSOCKET_URL") {
        endpoints.set_default(url);
    }

    let chain_id = parse_var::<u64>("FEED_CHAIN_ID")?;
    let pair = non_empty_var("FEED_PAIR")
        .unwrap_or_else(|| DEFAULT_PAIR.to_string())
        .parse::<TradingPair>()
        .map_err(|e| FeedError::Config(format!("FEED_PAIR: {e}")))?;
    let period = parse_var::<Period>("FEED_PERIOD")?.unwrap_or(Period::M1);

    let defaults = TimerConfig::default();
    let timers = TimerConfig {
        ping_interval: parse_secs("FEED_PING_SECS")?.unwrap_or(defaults.ping_interval),
        watchdog_interval: parse_secs("FEED_WATCHDOG_SECS")?
            .unwrap_or(defaults.watchdog_interval),
        stale_after: parse_secs("FEED_STALE_SECS")?,
    };

    let missed_pong = parse_var::<MissedPongPolicy>("FEED_MISSED_PONG")?.unwrap_or_default();
    let ca_file = non_empty_var("FEED_CA_FILE").map(PathBuf::from);

    Ok(AppConfig {
        endpoints,
        chain_id,
        pair,
        period,
        timers,
        missed_pong,
        ca_file,
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parse_var<T>(name: &str) -> crate::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_empty_var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| FeedError::Config(format!("{name}: {e}")))
        })
        .transpose()
}

fn parse_secs(name: &str) -> crate::Result<Option<Duration>> {
    match parse_var::<u64>(name)? {
        Some(0) => Err(FeedError::Config(format!("{name} must be greater than zero"))),
        other => Ok(other.map(Duration::from_secs)),
    }
}
