//! Merging of incoming ticker data into the displayed set.
//!
//! The first data (or data introducing a symbol the view does not know)
//! replaces the set and triggers a full render. Everything after that is
//! patched into the existing records in place so a running rotation and its
//! in-flight transition are never restarted.

use std::time::Duration;

use tracing::{debug, info};

use super::format::{FormattedTicker, MissingBaseline, format_clock};
use super::rotation::{DisplayMode, RotationScheduler, Tick};
use super::{DisplaySink, RenderFrame, TransitionTiming, ValuePatch};
use crate::config::AppConfig;
use crate::models::depth::DepthUpdate;
use crate::models::ticker::TickerSet;

/// Static settings for a [`DisplaySynchronizer`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Configured symbol order; full replaces are re-keyed into it.
    pub symbol_order: Vec<String>,
    pub mode: DisplayMode,
    pub visible_for: Duration,
    pub fade: Duration,
    pub show_change: bool,
    pub missing_baseline: MissingBaseline,
}

impl SyncSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            symbol_order: config.normalized_symbols(),
            mode: config.display.mode,
            visible_for: config.display.visible_for(),
            fade: config.display.fade(),
            show_change: config.display.show_change_percent,
            missing_baseline: config.display.missing_baseline,
        }
    }
}

/// What [`DisplaySynchronizer::apply`] did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The set was replaced and fully rendered.
    Rendered,
    /// Matching records were patched in place.
    Patched { updated: usize },
    /// Nothing to show or nothing matched.
    Unchanged,
}

/// What [`DisplaySynchronizer::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Shown { index: usize, refetch: bool },
    Halted,
}

/// Owner of the displayed [`TickerSet`].
pub struct DisplaySynchronizer<S> {
    tickers: TickerSet,
    rotation: RotationScheduler,
    sink: S,
    settings: SyncSettings,
}

impl<S: DisplaySink> DisplaySynchronizer<S> {
    pub fn new(sink: S, settings: SyncSettings) -> Self {
        let rotation = RotationScheduler::new(settings.mode, settings.visible_for, settings.fade);
        Self {
            tickers: TickerSet::empty(),
            rotation,
            sink,
            settings,
        }
    }

    /// Merges an update, choosing between full replace and in-place patch.
    pub fn apply(&mut self, update: TickerSet) -> SyncOutcome {
        if self.needs_full_replace(&update) {
            self.replace(update)
        } else {
            self.patch(update)
        }
    }

    /// Patches best bid/ask of matching records.
    pub fn apply_depth(&mut self, updates: &[DepthUpdate]) -> usize {
        let mut touched = Vec::new();
        for update in updates {
            if let Some(record) = self.tickers.get_mut(&update.symbol) {
                record.bid = update.bid;
                record.ask = update.ask;
                record.bid_volume = update.bid_volume;
                record.ask_volume = update.ask_volume;
                touched.push(update.symbol.as_str());
            }
        }
        let count = touched.len();
        self.push_visible(&touched);
        count
    }

    /// Advances the rotation and renders the newly selected record.
    pub fn tick(&mut self) -> TickOutcome {
        match self.rotation.tick() {
            Tick::Advanced { index, refetch, .. } => {
                self.render();
                if refetch {
                    debug!("Rotation cycle complete");
                }
                TickOutcome::Shown { index, refetch }
            }
            Tick::Halted => TickOutcome::Halted,
        }
    }

    pub fn tickers(&self) -> &TickerSet {
        &self.tickers
    }

    pub fn current_index(&self) -> Option<usize> {
        self.rotation.current()
    }

    pub fn is_rotating(&self) -> bool {
        self.rotation.is_running()
    }

    /// Period of the rotation timer.
    pub fn cycle_duration(&self) -> Duration {
        self.rotation.cycle_duration()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn needs_full_replace(&self, update: &TickerSet) -> bool {
        !self.rotation.is_running()
            || update.symbols().any(|s| !self.tickers.contains(s))
    }

    fn replace(&mut self, update: TickerSet) -> SyncOutcome {
        self.tickers = update.sorted_by_symbols(&self.settings.symbol_order);
        self.rotation.restart(self.tickers.len());

        if self.tickers.is_empty() {
            info!("Ticker set is empty, rotation halted");
            return SyncOutcome::Unchanged;
        }

        info!(count = self.tickers.len(), "Installed new ticker set");
        self.render();
        SyncOutcome::Rendered
    }

    fn patch(&mut self, update: TickerSet) -> SyncOutcome {
        let mut touched: Vec<String> = Vec::new();
        for incoming in update.records() {
            if let Some(record) = self.tickers.get_mut(&incoming.symbol) {
                record.last_price = incoming.last_price;
                record.change_percent = incoming.change_percent;
                record.baseline_missing = incoming.baseline_missing;
                touched.push(incoming.symbol.clone());
            }
        }
        self.tickers.set_last_update(update.last_update());

        if touched.is_empty() {
            return SyncOutcome::Unchanged;
        }

        let touched_refs: Vec<&str> = touched.iter().map(String::as_str).collect();
        self.push_visible(&touched_refs);
        debug!(updated = touched.len(), "Patched prices in place");
        SyncOutcome::Patched {
            updated: touched.len(),
        }
    }

    /// Sends value patches for the touched records that are on screen.
    fn push_visible(&mut self, touched: &[&str]) {
        let records = self.tickers.records();
        let values: Vec<FormattedTicker> = self
            .rotation
            .visible_indices()
            .into_iter()
            .filter_map(|i| records.get(i))
            .filter(|r| touched.contains(&r.symbol.as_str()))
            .map(|r| FormattedTicker::new(r, self.settings.missing_baseline))
            .collect();

        if values.is_empty() {
            return;
        }
        let patch = ValuePatch {
            values,
            last_update: self.last_update_text(),
        };
        self.sink.patch(&patch);
    }

    fn render(&mut self) {
        let Some(index) = self.rotation.current() else {
            return;
        };
        let records = self.tickers.records();
        let visible = self
            .rotation
            .visible_indices()
            .into_iter()
            .filter_map(|i| records.get(i))
            .map(|r| FormattedTicker::new(r, self.settings.missing_baseline))
            .collect();

        let frame = RenderFrame {
            visible,
            index,
            total: self.tickers.len(),
            transition: self.rotation.transition(),
            timing: TransitionTiming {
                fade_in: self.rotation.fade(),
                visible: self.rotation.visible_for(),
                fade_out: self.rotation.fade(),
            },
            show_change: self.settings.show_change,
            last_update: self.last_update_text(),
        };
        self.sink.render(&frame);
    }

    fn last_update_text(&self) -> Option<String> {
        self.tickers.last_update().and_then(format_clock)
    }
}
