//! # One-Pole Smoother
//!
//! Delay lengths arrive once per control cycle, in steps. Jumping the read
//! head straight to a new position cuts the waveform and clicks. This
//! smoother glides the read position toward its target instead, which
//! also gives length changes the pitch-bend sweep of a tape or BBD delay.
//!
//! It is the same recursion as a one-pole low-pass filter:
//!
//! ```text
//! y[n] = (1 - a) * target + a * y[n-1]
//! a    = e^(-1 / (time_s * sample_rate))
//! ```
//!
//! After `time_ms`, about 63% of any step has been covered.

/// Closer than this, the smoother lands exactly on its target.
const SNAP_DISTANCE: f32 = 1e-4;

/// Exponential glide toward a target value.
pub struct OnePoleSmoother {
    /// 0.0 jumps immediately; values near 1.0 glide slowly.
    coefficient: f32,
    current: f32,
}

impl OnePoleSmoother {
    /// A smoother that jumps straight to its target until
    /// [`set_time_ms`](Self::set_time_ms) is called.
    pub fn new(initial: f32) -> Self {
        Self {
            coefficient: 0.0,
            current: initial,
        }
    }

    /// Set the glide time constant.
    pub fn set_time_ms(&mut self, time_ms: f32, sample_rate: f32) {
        let samples = time_ms.max(0.0) * sample_rate / 1000.0;
        self.coefficient = if samples > 0.0 {
            (-1.0 / samples).exp()
        } else {
            0.0
        };
    }

    /// Advance one sample toward `target` and return the new value.
    pub fn next(&mut self, target: f32) -> f32 {
        if (target - self.current).abs() < SNAP_DISTANCE {
            self.current = target;
        } else {
            self.current = (1.0 - self.coefficient) * target + self.coefficient * self.current;
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Jump to `value` without gliding.
    pub fn reset(&mut self, value: f32) {
        self.current = value;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
