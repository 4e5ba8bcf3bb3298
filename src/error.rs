//! Crate-level error types.
//!
//! [`TickerError`] unifies every failure the feed engine can run into
//! (transport, protocol, REST fetch, configuration) behind a single enum so
//! callers can match on the variant they care about while still using the
//! `?` operator for easy propagation.
//!
//! Only [`TickerError::Fetch`] and [`TickerError::EmptySymbols`] ever reach
//! the orchestrator; transport and protocol errors are recovered inside the
//! feed client.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TickerError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum TickerError {
    /// Socket-level failure. The feed client reconnects after its fixed delay.
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// Malformed or unrecognised frame. Logged and dropped; the session stays up.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The primary batch ticker request failed; the whole fetch is discarded.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A per-symbol 24h baseline lookup failed. The record degrades to a
    /// zero change instead of failing the batch.
    #[error("partial data for {symbol}: {reason}")]
    PartialData { symbol: String, reason: String },

    /// A subscribe was attempted while the socket is not connected.
    #[error("websocket is not connected")]
    NotConnected,

    /// The client was stopped and cannot be restarted.
    #[error("feed client has been stopped")]
    Stopped,

    /// No symbols were configured or requested.
    #[error("no symbols configured")]
    EmptySymbols,

    /// A configuration file could not be read or holds invalid values.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TickerError {
    fn from(err: reqwest::Error) -> Self {
        TickerError::Fetch(err.to_string())
    }
}
