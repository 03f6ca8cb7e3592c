//! # Control Surface
//!
//! Three knobs and a tap footswitch, reduced to what the control loop
//! needs: a normalized value per knob, whether it moved since the last
//! cycle, and whether a new tap interval was measured.
//!
//! A [`ControlState`] is built fresh every cycle and moved into
//! [`ControlLoop::cycle`](crate::event_loop::ControlLoop::cycle), which
//! consumes it. Nothing carries over from one cycle to the next except the
//! knobs' last-seen values.

/// Smallest knob movement that counts as a change.
const CHANGE_EPSILON: f32 = 1e-6;

/// A continuous control with change tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knob {
    value: f32,
    changed: bool,
}

impl Knob {
    /// A knob at `value` that has not moved.
    pub const fn new(value: f32) -> Self {
        Self {
            value,
            changed: false,
        }
    }

    /// A knob at `value` that reports a change on its next read. Used at
    /// start-up so the first cycle syncs the delay lines to the knobs.
    pub const fn changed(value: f32) -> Self {
        Self {
            value,
            changed: true,
        }
    }

    /// Record a new position. Values are clamped to `[0, 1]`; NaN is
    /// ignored.
    pub fn set(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        let value = value.clamp(0.0, 1.0);
        if (self.value - value).abs() > CHANGE_EPSILON {
            self.value = value;
            self.changed = true;
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Read the knob for this cycle and clear its change flag.
    pub fn take(&mut self) -> ControlReading {
        let reading = ControlReading {
            value: self.value(),
            changed: self.has_changed(),
        };
        self.changed = false;
        reading
    }
}

/// One knob as seen by one control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlReading {
    pub value: f32,
    pub changed: bool,
}

impl ControlReading {
    /// A reading that did not change this cycle.
    pub const fn steady(value: f32) -> Self {
        Self {
            value,
            changed: false,
        }
    }

    /// A reading that changed this cycle.
    pub const fn moved(value: f32) -> Self {
        Self {
            value,
            changed: true,
        }
    }
}

/// A freshly measured tap interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapEvent {
    pub interval_ms: f32,
}

/// Source of tap-tempo intervals.
pub trait TapButton {
    /// Whether a new interval has been measured since the last call.
    /// Clears the flag.
    fn new_tap_interval(&mut self) -> bool;

    /// The most recent interval, in ms.
    fn tap_interval_ms(&self) -> f32;

    /// Convenience: the pending tap as an event, if there is one.
    fn take_tap(&mut self) -> Option<TapEvent> {
        self.new_tap_interval().then(|| TapEvent {
            interval_ms: self.tap_interval_ms(),
        })
    }
}

/// Everything the control loop reads in one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub feedback: ControlReading,
    pub driver_length: ControlReading,
    pub ratio: ControlReading,
    pub tap: Option<TapEvent>,
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
