//! Display-side state: the authoritative ticker set, rotation, and the
//! boundary to whatever actually draws it.
//!
//! - [`sync`] - merges updates as full renders or in-place value patches
//! - [`rotation`] - visible index and cycle boundaries
//! - [`format`] - price precision, change text and color classification

pub mod format;
pub mod rotation;
pub mod sync;

use std::time::Duration;

use serde::Serialize;
use tracing::info;

pub use format::{ColorClass, FormattedTicker, MissingBaseline};
pub use rotation::{DisplayMode, RotationScheduler, Tick, Transition};
pub use sync::{DisplaySynchronizer, SyncOutcome, SyncSettings, TickOutcome};

/// Rendering boundary implemented by the presentation layer.
///
/// Calls are fire-and-forget; the synchronizer never waits on the sink.
pub trait DisplaySink {
    /// Redraws the view from scratch, restarting any transition.
    fn render(&mut self, frame: &RenderFrame);

    /// Updates value text and color of already-drawn records in place.
    fn patch(&mut self, patch: &ValuePatch);
}

/// Everything needed to draw the view from scratch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    /// Visible records, leading record first.
    pub visible: Vec<FormattedTicker>,
    /// Index of the leading record within the full set.
    pub index: usize,
    pub total: usize,
    pub transition: Transition,
    pub timing: TransitionTiming,
    pub show_change: bool,
    /// `HH:MM:SS` of the data currently shown.
    pub last_update: Option<String>,
}

/// Durations of the three animation phases of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionTiming {
    pub fade_in: Duration,
    pub visible: Duration,
    pub fade_out: Duration,
}

/// New values for records that are already on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuePatch {
    pub values: Vec<FormattedTicker>,
    pub last_update: Option<String>,
}

/// Sink that writes every render and patch to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl DisplaySink for LogSink {
    fn render(&mut self, frame: &RenderFrame) {
        for ticker in &frame.visible {
            info!(
                symbol = %ticker.display_symbol,
                price = %ticker.price_text,
                change = %ticker.change_text,
                class = ticker.class.as_str(),
                index = frame.index,
                total = frame.total,
                last_update = ?frame.last_update,
                "Render"
            );
        }
    }

    fn patch(&mut self, patch: &ValuePatch) {
        for ticker in &patch.values {
            info!(
                symbol = %ticker.display_symbol,
                price = %ticker.price_text,
                change = %ticker.change_text,
                class = ticker.class.as_str(),
                last_update = ?patch.last_update,
                "Patch"
            );
        }
    }
}
