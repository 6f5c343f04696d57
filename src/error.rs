//! Crate-level error types.
//!
//! [`FeedError`] unifies every error source (configuration, TLS, WebSocket,
//! JSON) behind a single enum so callers can match on the variant they
//! care about while still using the `?` operator for easy propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// An environment variable or endpoint file was missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The pinned CA certificate could not be loaded.
    #[error("tls error: {0}")]
    Tls(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A topic, trading pair, or period string could not be parsed.
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    /// The task on the other end of an internal channel has stopped.
    #[error("feed channel closed")]
    ChannelClosed,
}
