//! Live market-data feed for a perpetual-futures exchange.
//!
//! Keeps a single WebSocket connection's topic subscriptions in step with a
//! selected trading pair and candle period, and maintains the resulting
//! OHLC candle sequence and market ticker board.

pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;
pub mod tls;
pub mod websocket;

pub use error::{FeedError, Result};
pub use feed::{FeedHandle, MarketFeed};
pub use session::{ConnectionStatus, FeedControl, FeedEvent};
