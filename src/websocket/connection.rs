//! Feed connection lifecycle.
//!
//! [`FeedClient`] owns one background task that connects, keeps the
//! session alive with heartbeats, forwards decoded frames, and reconnects
//! after a fixed delay for as long as the client is not stopped. The task is
//! the only writer of the connection state, so transitions are serialized
//! and only one timer (heartbeat or reconnect delay) is ever armed.

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tungstenite::Message;

use super::{FeedEvent, WsReader, WsWriter, connect, handler, ping, subscribe};
use crate::config::WebSocketConfig;
use crate::models::SubscriptionConfig;
use crate::{Result, TickerError};

/// Connection state of a [`FeedClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Timing and endpoint settings for a [`FeedClient`].
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub url: String,
    pub heartbeat_interval: Duration,
    /// Fixed wait between a lost connection and the next attempt.
    pub reconnect_delay: Duration,
    pub event_buffer: usize,
}

impl FeedSettings {
    pub fn from_config(config: &WebSocketConfig) -> Self {
        Self {
            url: config.url.clone(),
            heartbeat_interval: config.heartbeat_interval(),
            reconnect_delay: config.reconnect_delay(),
            event_buffer: config.event_buffer,
        }
    }
}

/// Requests from the client handle to the connection task.
enum Command {
    Subscribe {
        subscription: SubscriptionConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

/// Why a connected session ended.
enum SessionEnd {
    /// Transport closed, errored, or a heartbeat could not be sent.
    Lost(String),
    /// The client asked to stop.
    Shutdown,
}

/// Long-lived feed subscription with heartbeat and automatic reconnect.
///
/// Reconnect attempts repeat indefinitely at a fixed delay until
/// [`stop`](FeedClient::stop) is called. Subscriptions are not remembered
/// across reconnects; re-issue them on every
/// [`FeedEvent::StateChanged`]`(`[`ConnectionState::Connected`]`)`.
pub struct FeedClient {
    settings: FeedSettings,
    state_rx: watch::Receiver<ConnectionState>,
    state_tx: Option<watch::Sender<ConnectionState>>,
    events: broadcast::Sender<FeedEvent>,
    commands: Option<mpsc::UnboundedSender<Command>>,
    task: Option<JoinHandle<()>>,
    stopped: bool,
}

impl FeedClient {
    /// Creates a client in the `Disconnected` state without connecting.
    #[must_use]
    pub fn new(settings: FeedSettings) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(settings.event_buffer.max(1));
        Self {
            settings,
            state_rx,
            state_tx: Some(state_tx),
            events,
            commands: None,
            task: None,
            stopped: false,
        }
    }

    /// A new receiver for every event emitted from now on.
    pub fn events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Starts the connection task. Calling it again while running is a no-op.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::Stopped`] once the client has been stopped.
    pub fn start(&mut self) -> Result<()> {
        if self.stopped {
            return Err(TickerError::Stopped);
        }
        let Some(state) = self.state_tx.take() else {
            return Ok(());
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let connection = Connection {
            settings: self.settings.clone(),
            state,
            events: self.events.clone(),
            commands: commands_rx,
        };
        self.commands = Some(commands_tx);
        self.task = Some(tokio::spawn(connection.run()));
        Ok(())
    }

    /// Sends one subscribe frame for `subscription`.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::NotConnected`] unless the client is
    /// `Connected`, or [`TickerError::Transport`] if the send fails.
    pub async fn subscribe(&self, subscription: &SubscriptionConfig) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(TickerError::NotConnected);
        }
        let commands = self.commands.as_ref().ok_or(TickerError::NotConnected)?;

        let (reply, response) = oneshot::channel();
        commands
            .send(Command::Subscribe {
                subscription: subscription.clone(),
                reply,
            })
            .map_err(|_| TickerError::NotConnected)?;
        response.await.map_err(|_| TickerError::NotConnected)?
    }

    /// Stops the client for good.
    ///
    /// Closes an open socket and cancels any pending heartbeat or reconnect
    /// timer. When this returns the connection task has exited, so no
    /// further events or state transitions can occur. Idempotent.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.state_tx = None;

        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Shutdown);
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!(error = %e, "Feed connection task failed");
        }
        info!("Feed client stopped");
    }
}

/// State owned by the background connection task.
struct Connection {
    settings: FeedSettings,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<FeedEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Connection {
    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            info!(url = %self.settings.url, "Connecting to WebSocket");

            let Some(attempt) = self.connect_or_shutdown().await else {
                break;
            };

            match attempt {
                Ok((write, read)) => {
                    self.set_state(ConnectionState::Connected);
                    match self.session(write, read).await {
                        SessionEnd::Lost(reason) => {
                            warn!(%reason, "WebSocket session ended");
                        }
                        SessionEnd::Shutdown => break,
                    }
                }
                Err(e) => error!(error = %e, "WebSocket connection failed"),
            }

            self.set_state(ConnectionState::Disconnected);
            info!(
                delay_ms = self.settings.reconnect_delay.as_millis() as u64,
                "Reconnecting after delay"
            );
            if !self.wait_reconnect_delay().await {
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
        debug!("Feed connection task exiting");
    }

    /// Publishes a state change; repeated states are not re-announced.
    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(state = ?next, "Connection state changed");
            let _ = self.events.send(FeedEvent::StateChanged(next));
        }
    }

    /// Connects unless a shutdown arrives first (`None`).
    async fn connect_or_shutdown(&mut self) -> Option<Result<(WsWriter, WsReader)>> {
        let url = self.settings.url.clone();
        let attempt = connect(&url);
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                result = &mut attempt => return Some(result),
                cmd = self.commands.recv() => {
                    if !reject_while_offline(cmd) {
                        return None;
                    }
                }
            }
        }
    }

    /// Sleeps the reconnect delay. Returns `false` if shut down meanwhile.
    async fn wait_reconnect_delay(&mut self) -> bool {
        let delay = tokio::time::sleep(self.settings.reconnect_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                () = &mut delay => return true,
                cmd = self.commands.recv() => {
                    if !reject_while_offline(cmd) {
                        return false;
                    }
                }
            }
        }
    }

    /// Runs one connected session until it is lost or shut down.
    async fn session<W, R>(&mut self, mut write: W, mut read: R) -> SessionEnd
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
        R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
    {
        let period = self.settings.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text),
                    Some(Ok(Message::Close(frame))) => {
                        return SessionEnd::Lost(format!("closed by server: {frame:?}"));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return SessionEnd::Lost(TickerError::Transport(e).to_string());
                    }
                    None => return SessionEnd::Lost("stream ended".to_string()),
                },

                _ = heartbeat.tick() => {
                    if let Err(e) = ping(&mut write).await {
                        return SessionEnd::Lost(format!("heartbeat failed: {e}"));
                    }
                }

                cmd = self.commands.recv() => match cmd {
                    Some(Command::Subscribe { subscription, reply }) => {
                        let result = subscribe(&mut write, &subscription).await;
                        let failed = matches!(result, Err(TickerError::Transport(_)));
                        let _ = reply.send(result);
                        if failed {
                            return SessionEnd::Lost("subscribe send failed".to_string());
                        }
                    }
                    Some(Command::Shutdown) | None => {
                        self.set_state(ConnectionState::Closing);
                        if let Err(e) = write.close().await {
                            debug!(error = %e, "Close handshake failed");
                        }
                        return SessionEnd::Shutdown;
                    }
                },
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match handler::parse_frame(text) {
            Ok(Some(event)) => {
                let _ = self.events.send(event);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Dropping frame"),
        }
    }
}

/// Answers a command that arrived while no socket is open. Returns `false`
/// when the command asks the task to exit.
fn reject_while_offline(cmd: Option<Command>) -> bool {
    match cmd {
        Some(Command::Subscribe { reply, .. }) => {
            let _ = reply.send(Err(TickerError::NotConnected));
            true
        }
        Some(Command::Shutdown) | None => false,
    }
}
