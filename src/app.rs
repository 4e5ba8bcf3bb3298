//! Orchestration of fetches, feed events and rotation timing.
//!
//! [`TickerApp`] is a single task that owns the [`DisplaySynchronizer`].
//! Producers never touch the displayed set: REST fetches run in a spawned
//! task whose handle resolves to a finished [`TickerSet`], and feed frames
//! arrive as [`FeedEvent`]s.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{AcquisitionMode, AppConfig};
use crate::display::{DisplaySink, DisplaySynchronizer, SyncOutcome, SyncSettings, TickOutcome};
use crate::models::SubscriptionConfig;
use crate::models::ticker::TickerSet;
use crate::rest::{MarketApi, RestTickerFetcher};
use crate::websocket::{ConnectionState, FeedClient, FeedEvent, FeedSettings};
use crate::Result;

/// Ties the fetcher, the feed client and the display together.
pub struct TickerApp<S, A> {
    config: AppConfig,
    symbols: Vec<String>,
    sync: DisplaySynchronizer<S>,
    fetcher: Arc<RestTickerFetcher<A>>,
    fetch_task: Option<JoinHandle<Result<TickerSet>>>,
    rotation_deadline: Option<Instant>,
}

impl<S, A> TickerApp<S, A>
where
    S: DisplaySink,
    A: MarketApi + 'static,
{
    /// Validates the configuration and builds the app.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::EmptySymbols`](crate::TickerError::EmptySymbols)
    /// or [`TickerError::Config`](crate::TickerError::Config) for an unusable
    /// configuration.
    pub fn new(config: AppConfig, sink: S, api: A) -> Result<Self> {
        config.validate()?;
        let symbols = config.normalized_symbols();
        let sync = DisplaySynchronizer::new(sink, SyncSettings::from_config(&config));
        Ok(Self {
            config,
            symbols,
            sync,
            fetcher: Arc::new(RestTickerFetcher::new(api)),
            fetch_task: None,
            rotation_deadline: None,
        })
    }

    /// Runs until `shutdown` completes, then stops the feed client and
    /// returns the synchronizer with the last displayed state.
    ///
    /// # Errors
    ///
    /// Returns an error only if the feed client cannot be started.
    pub async fn run<F>(mut self, shutdown: F) -> Result<DisplaySynchronizer<S>>
    where
        F: Future<Output = ()>,
    {
        let mode = self.config.acquisition;
        let subscription = SubscriptionConfig::new(&self.symbols, &self.config.websocket.channels);

        let mut feed = mode
            .uses_websocket()
            .then(|| FeedClient::new(FeedSettings::from_config(&self.config.websocket)));
        let mut feed_events = feed.as_ref().map(FeedClient::events);
        if let Some(feed) = feed.as_mut() {
            feed.start()?;
        }

        if mode.uses_rest() {
            self.request_fetch();
        }

        let poll = self.config.rest.poll_interval();
        let mut retry = tokio::time::interval_at(Instant::now() + poll, poll);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(symbols = ?self.symbols, ?mode, "Ticker display started");
        tokio::pin!(shutdown);

        loop {
            let deadline = self.rotation_deadline;
            tokio::select! {
                () = &mut shutdown => break,

                joined = join_fetch(&mut self.fetch_task), if self.fetch_task.is_some() => {
                    self.fetch_task = None;
                    match joined {
                        Ok(Ok(set)) => self.apply(set),
                        Ok(Err(e)) => error!(error = %e, "Ticker fetch failed, keeping last values"),
                        Err(e) => error!(error = %e, "Ticker fetch task died, keeping last values"),
                    }
                }

                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.advance_rotation();
                }

                _ = retry.tick(), if mode.uses_rest() && !self.sync.is_rotating() => {
                    debug!("Nothing displayed yet, retrying fetch");
                    self.request_fetch();
                }

                event = next_event(&mut feed_events), if feed_events.is_some() => match event {
                    Ok(event) => self.handle_feed_event(event, feed.as_ref(), &subscription).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Feed events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => feed_events = None,
                },
            }
        }

        info!("Shutting down ticker display");
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Some(feed) = feed.as_mut() {
            feed.stop().await;
        }
        Ok(self.sync)
    }

    fn apply(&mut self, set: TickerSet) {
        match self.sync.apply(set) {
            SyncOutcome::Rendered => self.arm_rotation(),
            SyncOutcome::Unchanged if !self.sync.is_rotating() => {
                self.rotation_deadline = None;
            }
            SyncOutcome::Patched { .. } | SyncOutcome::Unchanged => {}
        }
    }

    fn advance_rotation(&mut self) {
        match self.sync.tick() {
            TickOutcome::Shown { refetch, .. } => {
                self.arm_rotation();
                if refetch && self.config.acquisition.uses_rest() {
                    self.request_fetch();
                }
            }
            TickOutcome::Halted => self.rotation_deadline = None,
        }
    }

    fn arm_rotation(&mut self) {
        self.rotation_deadline = Some(Instant::now() + self.sync.cycle_duration());
    }

    /// Spawns a fetch unless one is already running.
    fn request_fetch(&mut self) {
        if self.fetch_task.is_some() {
            debug!("Fetch already in flight, skipping");
            return;
        }
        let fetcher = Arc::clone(&self.fetcher);
        let symbols = self.symbols.clone();
        self.fetch_task = Some(tokio::spawn(async move { fetcher.fetch(&symbols).await }));
    }

    /// Stream frames carry one or a few symbols. When a frame introduces a
    /// symbol, the rest of the displayed set is carried over so the full
    /// replace does not drop it.
    fn merge_stream_update(&self, update: TickerSet) -> TickerSet {
        let current = self.sync.tickers();
        if update.symbols().all(|s| current.contains(s)) {
            return update;
        }
        let last_update = update.last_update();
        let mut records = update.into_records();
        for record in current.records() {
            if !records.iter().any(|r| r.symbol == record.symbol) {
                records.push(record.clone());
            }
        }
        TickerSet::new(records, last_update)
    }

    async fn handle_feed_event(
        &mut self,
        event: FeedEvent,
        feed: Option<&FeedClient>,
        subscription: &SubscriptionConfig,
    ) {
        match event {
            FeedEvent::StateChanged(ConnectionState::Connected) => {
                let Some(feed) = feed else { return };
                if let Err(e) = feed.subscribe(subscription).await {
                    warn!(error = %e, "Subscribe after connect failed");
                }
            }
            FeedEvent::StateChanged(state) => debug!(?state, "Feed state"),
            FeedEvent::Ticker(set) => {
                // hybrid mode waits for the REST snapshot before patching
                if self.config.acquisition == AcquisitionMode::Hybrid && !self.sync.is_rotating() {
                    return;
                }
                let set = self.merge_stream_update(set);
                self.apply(set);
            }
            FeedEvent::Depth(updates) => {
                self.sync.apply_depth(&updates);
            }
            FeedEvent::Trade(trades) => debug!(count = trades.len(), "Trades received"),
        }
    }
}

async fn join_fetch(
    task: &mut Option<JoinHandle<Result<TickerSet>>>,
) -> std::result::Result<Result<TickerSet>, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

async fn next_event(
    rx: &mut Option<broadcast::Receiver<FeedEvent>>,
) -> std::result::Result<FeedEvent, broadcast::error::RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

