//! Public entry point: spawn a live feed and control it through a handle.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AppConfig;
use crate::models::{Period, TradingPair};
use crate::session::{FeedControl, FeedEvent, FeedSession};
use crate::tls::build_tls_config;
use crate::websocket::ConnectionManager;
use crate::{FeedError, Result};

/// Builder for a running market-data feed.
pub struct MarketFeed;

impl MarketFeed {
    /// Starts the connection manager and session tasks for `config`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Tls`] if a pinned CA file is configured but
    /// cannot be loaded.
    pub fn spawn(config: &AppConfig) -> Result<(FeedHandle, mpsc::UnboundedReceiver<FeedEvent>)> {
        let tls_config = build_tls_config(config.ca_file.as_deref())?;
        let url = config.websocket_url().to_string();

        let (conn_tx, conn_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let manager = ConnectionManager::new(
            url,
            tls_config,
            config.timers.ping_interval,
            config.missed_pong,
            conn_tx,
            cmd_rx,
        );
        let session = FeedSession::new(
            config.endpoints.clone(),
            config.chain_id,
            config.pair.clone(),
            config.period,
            config.timers.watchdog_interval,
            config.timers.stale_after,
            cmd_tx,
            event_tx,
        );

        let connection_task = tokio::spawn(manager.run());
        let session_task = tokio::spawn(session.run(conn_rx, control_rx));
        info!(pair = %config.pair, period = %config.period, "Market feed started");

        let handle = FeedHandle {
            control: control_tx,
            tasks: Some((session_task, connection_task)),
        };
        Ok((handle, event_rx))
    }
}

/// Controls a running feed.
///
/// Dropping the handle closes the control channel, which tears the feed
/// down as if [`shutdown`](Self::shutdown) had been called.
pub struct FeedHandle {
    control: mpsc::UnboundedSender<FeedControl>,
    tasks: Option<(JoinHandle<()>, JoinHandle<()>)>,
}

impl FeedHandle {
    /// Selects a different trading pair.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::ChannelClosed`] if the feed has stopped.
    pub fn set_pair(&self, pair: TradingPair) -> Result<()> {
        self.send(FeedControl::SetPair(pair))
    }

    /// Selects a different candle period.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::ChannelClosed`] if the feed has stopped.
    pub fn set_period(&self, period: Period) -> Result<()> {
        self.send(FeedControl::SetPeriod(period))
    }

    /// Reconnects to the endpoint configured for `chain_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::ChannelClosed`] if the feed has stopped.
    pub fn switch_chain(&self, chain_id: Option<u64>) -> Result<()> {
        self.send(FeedControl::SwitchChain(chain_id))
    }

    /// Unsubscribes, closes the socket and waits for both tasks to finish.
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn shutdown(&mut self) {
        let Some((session_task, connection_task)) = self.tasks.take() else {
            return;
        };

        let _ = self.control.send(FeedControl::Shutdown);
        let _ = session_task.await;
        let _ = connection_task.await;
        info!("Market feed stopped");
    }

    fn send(&self, control: FeedControl) -> Result<()> {
        self.control
            .send(control)
            .map_err(|_| FeedError::ChannelClosed)
    }
}
