//! Async WebSocket client for the Bitunix futures public feed.
//!
//! This module is organized by concern:
//! - [`connection`] - [`FeedClient`] and its connect/heartbeat/reconnect loop
//! - [`subscription`] - subscribe frames
//! - [`handler`] - inbound frame decoding

mod connection;
mod handler;
mod subscription;

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use tungstenite::Message;

use crate::models::PingRequest;
use crate::models::depth::DepthUpdate;
use crate::models::ticker::TickerSet;
use crate::models::trade::TradeData;
use crate::{Result, TickerError};

pub use connection::{ConnectionState, FeedClient, FeedSettings};
pub use handler::parse_frame;
pub use subscription::subscribe;

/// Upper bound on a single connect attempt (TCP + TLS + upgrade).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Write half of a feed connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a feed connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Events emitted by a [`FeedClient`], in arrival order.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The connection state changed. Subscriptions must be re-issued on
    /// every transition to [`ConnectionState::Connected`].
    StateChanged(ConnectionState),
    /// Decoded `ticker` channel data.
    Ticker(TickerSet),
    /// Decoded `trade` channel data.
    Trade(Vec<TradeData>),
    /// Decoded `depth_book1` channel data.
    Depth(Vec<DepthUpdate>),
}

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns [`TickerError::Transport`] if the connection, TLS handshake or
/// upgrade fails or does not finish within the connect timeout.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| {
            TickerError::Transport(tungstenite::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "websocket connect timed out",
            )))
        })??;
    info!(url, "WebSocket handshake completed");

    Ok(ws_stream.split())
}

/// Sends a heartbeat ping stamped with the current time.
///
/// # Errors
///
/// Returns [`TickerError::Transport`] if sending the message fails.
pub async fn ping<S>(write: &mut S) -> Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let request = PingRequest::now();
    let json = serde_json::to_string(&request)?;
    write.send(Message::Text(json.into())).await?;
    debug!(ping = request.ping, "Sent ping");

    Ok(())
}
