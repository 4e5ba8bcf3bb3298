//! Channel subscription frames.

use futures_util::{Sink, SinkExt};
use tracing::{debug, info};
use tungstenite::Message;

use crate::Result;
use crate::models::{SubscribeRequest, SubscriptionConfig};

/// Sends one subscribe frame covering every (symbol, channel) pair.
///
/// # Errors
///
/// Returns a [`TickerError`](crate::TickerError) if serializing or sending
/// the subscription message fails.
pub async fn subscribe<S>(write: &mut S, subscription: &SubscriptionConfig) -> Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let request = SubscribeRequest::new(subscription);
    let json = serde_json::to_string(&request)?;
    debug!("Sending subscribe request: {}", json);
    write.send(Message::Text(json.into())).await?;
    info!(
        symbols = ?subscription.symbols,
        channels = ?subscription.channels,
        "Subscribed to channels"
    );

    Ok(())
}
