//! # Tap Tempo
//!
//! Turns footswitch presses into a delay length: the time between two
//! presses *is* the new driver length. There is no averaging and no
//! snapping to musical divisions. The last two presses decide.
//!
//! ```text
//! press ──── 450 ms ──── press ──── 452 ms ──── press
//!                         │                       │
//!                  interval = 450          interval = 452
//! ```
//!
//! Two guards keep stray presses from producing absurd lengths:
//!
//! - Presses closer than [`MIN_TAP_INTERVAL_MS`] are switch bounce and are
//!   dropped.
//! - A gap longer than the maximum interval means the player stopped
//!   tapping. That press starts a new measurement instead of producing an
//!   interval.

use crate::control::TapButton;

/// Presses closer together than this are treated as contact bounce.
pub const MIN_TAP_INTERVAL_MS: f32 = 50.0;

/// Measures the interval between consecutive presses.
#[derive(Debug, Clone)]
pub struct TapTempo {
    /// Longest gap that still counts as an interval.
    max_interval_ms: f32,
    /// Timestamp of the last accepted press.
    last_press_ms: Option<f64>,
    /// Most recent measured interval.
    interval_ms: f32,
    /// Set when `interval_ms` has not been read yet.
    pending: bool,
}

impl TapTempo {
    pub fn new(max_interval_ms: f32) -> Self {
        Self {
            max_interval_ms,
            last_press_ms: None,
            interval_ms: 0.0,
            pending: false,
        }
    }

    /// Register a press at `now_ms` (any monotonic clock in milliseconds).
    pub fn press(&mut self, now_ms: f64) {
        let Some(last) = self.last_press_ms else {
            self.last_press_ms = Some(now_ms);
            return;
        };

        let interval = (now_ms - last) as f32;
        if interval < MIN_TAP_INTERVAL_MS {
            return;
        }

        self.last_press_ms = Some(now_ms);
        if interval <= self.max_interval_ms {
            self.interval_ms = interval;
            self.pending = true;
        }
    }

    /// Forget the last press and any unread interval.
    pub fn reset(&mut self) {
        self.last_press_ms = None;
        self.pending = false;
    }
}

impl TapButton for TapTempo {
    fn new_tap_interval(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    fn tap_interval_ms(&self) -> f32 {
        self.interval_ms
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
