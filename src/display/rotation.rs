//! Rotation scheduling: which record is visible and when a full cycle ends.
//!
//! The scheduler is a plain state machine; the orchestrator owns the timer
//! and calls [`RotationScheduler::tick`] once per [`cycle_duration`].
//!
//! [`cycle_duration`]: RotationScheduler::cycle_duration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How records are laid out on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// One record at a time.
    #[default]
    Rotate,
    /// Every record, starting at the current index (marquee offset).
    Scroll,
}

/// How the view moves to the next record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transition {
    /// Swap with no blackout gap.
    Immediate,
    /// Fade out then fade in, each lasting `fade`.
    CrossFade { fade: Duration },
}

/// Result of advancing the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Advanced {
        index: usize,
        transition: Transition,
        /// Set when the index wrapped back to 0 (a full cycle completed).
        refetch: bool,
    },
    /// The sequence is empty; nothing to show.
    Halted,
}

#[derive(Debug, Clone)]
pub struct RotationScheduler {
    mode: DisplayMode,
    current: usize,
    len: usize,
    visible_for: Duration,
    fade: Duration,
}

impl RotationScheduler {
    pub fn new(mode: DisplayMode, visible_for: Duration, fade: Duration) -> Self {
        Self {
            mode,
            current: 0,
            len: 0,
            visible_for,
            fade,
        }
    }

    /// Starts over at index 0 for a sequence of `len` records.
    pub fn restart(&mut self, len: usize) {
        self.len = len;
        self.current = 0;
    }

    /// Advances to the next record.
    pub fn tick(&mut self) -> Tick {
        if self.len == 0 {
            return Tick::Halted;
        }
        self.current = (self.current + 1) % self.len;
        Tick::Advanced {
            index: self.current,
            transition: self.transition(),
            refetch: self.current == 0,
        }
    }

    /// Index of the leading visible record, `None` while halted.
    pub fn current(&self) -> Option<usize> {
        (self.len > 0).then_some(self.current)
    }

    pub fn is_running(&self) -> bool {
        self.len > 0
    }

    pub fn visible_for(&self) -> Duration {
        self.visible_for
    }

    pub fn fade(&self) -> Duration {
        self.fade
    }

    pub fn transition(&self) -> Transition {
        if self.fade.is_zero() {
            Transition::Immediate
        } else {
            Transition::CrossFade { fade: self.fade }
        }
    }

    /// Time each record occupies: fade-in + visible + fade-out.
    pub fn cycle_duration(&self) -> Duration {
        self.fade + self.visible_for + self.fade
    }

    /// Indices currently on screen, leading record first.
    pub fn visible_indices(&self) -> Vec<usize> {
        if self.len == 0 {
            return Vec::new();
        }
        match self.mode {
            DisplayMode::Rotate => vec![self.current],
            DisplayMode::Scroll => (0..self.len).map(|i| (self.current + i) % self.len).collect(),
        }
    }
}
