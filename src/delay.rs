//! # Delay Line Parameters
//!
//! The parameter side of one delay line: how long it is, how much of its
//! output it feeds back, and how its clean and delayed signals are mixed.
//! The samples themselves live in the engine (see
//! [`DelayBuffer`](crate::dsp::delay_line::DelayBuffer)); the engine picks
//! these values up once per control cycle.
//!
//! Every setter clamps. A knob can never put a delay line into an illegal
//! state, so there is nothing to report back to the caller.

/// Shortest legal length of any delay line, in milliseconds.
pub const MIN_LENGTH_MS: f32 = 0.0;

/// Fixed clean/effect balance of a delay line's main output.
///
/// ```text
/// main_output = clean * main_input + effect * delayed
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixLevels {
    /// Gain applied to the undelayed input.
    pub clean: f32,
    /// Gain applied to the delayed signal.
    pub effect: f32,
}

/// Everything needed to construct a [`DelayLine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayLineSettings {
    /// Length before any control has been applied, in ms.
    pub initial_length_ms: f32,
    /// Upper bound of the length, in ms. Never changes afterwards.
    pub max_length_ms: f32,
    /// Feedback before any control has been applied.
    pub feedback: f32,
    /// Fixed output mix.
    pub mix: MixLevels,
    /// Whether the line exposes an aux send/receive pair in its feedback
    /// path.
    pub aux_loop_enabled: bool,
}

/// Runtime parameters of one delay line.
///
/// Only `length_ms` and `feedback` change after construction, and only
/// through the clamping setters.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayLine {
    length_ms: f32,
    feedback: f32,
    max_length_ms: f32,
    mix: MixLevels,
    aux_loop_enabled: bool,
}

impl DelayLine {
    /// Build a delay line from its construction settings. The initial
    /// length and feedback go through the same clamps as later writes.
    pub fn new(settings: DelayLineSettings) -> Self {
        let mut line = Self {
            length_ms: MIN_LENGTH_MS,
            feedback: 0.0,
            max_length_ms: settings.max_length_ms.max(MIN_LENGTH_MS),
            mix: settings.mix,
            aux_loop_enabled: settings.aux_loop_enabled,
        };
        line.set_length_ms(settings.initial_length_ms);
        line.set_feedback(settings.feedback);
        line
    }

    /// Write a new length, clamped to `[MIN_LENGTH_MS, max_length_ms]`.
    ///
    /// Returns the length actually stored. A NaN write is dropped and the
    /// previous length is returned.
    pub fn set_length_ms(&mut self, length_ms: f32) -> f32 {
        if !length_ms.is_nan() {
            self.length_ms = length_ms.clamp(MIN_LENGTH_MS, self.max_length_ms);
        }
        self.length_ms
    }

    /// Write a new feedback amount, clamped to `[0, 1]`. NaN is dropped.
    pub fn set_feedback(&mut self, feedback: f32) {
        if !feedback.is_nan() {
            self.feedback = feedback.clamp(0.0, 1.0);
        }
    }

    pub fn length_ms(&self) -> f32 {
        self.length_ms
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn max_length_ms(&self) -> f32 {
        self.max_length_ms
    }

    pub fn mix(&self) -> MixLevels {
        self.mix
    }

    pub fn aux_loop_enabled(&self) -> bool {
        self.aux_loop_enabled
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
