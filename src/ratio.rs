//! # Propagation Ratio
//!
//! The ratio knob sets how long the propagator is compared to the driver.
//! The knob's travel is split at the centre:
//!
//! ```text
//! position   0.0 ──────────── 0.5 ──────────── 1.0
//! factor     4.0 ──────────► 1.0 ◄──────────── 4.0
//! use        driver / factor  unity  driver * factor
//!            (propagator shorter)    (propagator longer)
//! ```
//!
//! Both halves reach a factor of 1 at the centre, so turning the knob
//! through noon never makes the propagator jump.
//!
//! Nothing here clamps to the propagator's maximum length. The controller
//! does that before writing.

use crate::config::MAX_PROPAGATION_FACTOR;

/// Knob position where the propagator matches the driver.
pub const CENTRE: f32 = 0.5;

/// Which side of the centre the ratio knob is on, with the factor for that
/// side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Propagation {
    /// Left of centre: the propagator is `driver / factor`.
    Shorten(f32),
    /// Exactly at the centre.
    Unity,
    /// Right of centre: the propagator is `driver * factor`.
    Lengthen(f32),
}

impl Propagation {
    /// Classify a knob position. Positions outside `[0, 1]` are clamped; a
    /// NaN position reads as the centre.
    pub fn from_position(position: f32) -> Self {
        Self::with_max_factor(position, MAX_PROPAGATION_FACTOR)
    }

    /// Like [`from_position`](Self::from_position), with the factor at
    /// either end of the knob set to `max_factor` instead of the default 4.
    pub fn with_max_factor(position: f32, max_factor: f32) -> Self {
        if position.is_nan() {
            return Self::Unity;
        }
        let position = position.clamp(0.0, 1.0);
        let span = max_factor - 1.0;

        if position > CENTRE {
            // (0.5, 1] → (1, max]
            Self::Lengthen(1.0 + (position - CENTRE) / CENTRE * span)
        } else if position < CENTRE {
            // [0, 0.5) → [max, 1), inverted
            Self::Shorten(max_factor - position / CENTRE * span)
        } else {
            Self::Unity
        }
    }

    /// The factor in `[1, MAX_PROPAGATION_FACTOR]`, independent of
    /// direction.
    pub fn factor(self) -> f32 {
        match self {
            Self::Shorten(factor) | Self::Lengthen(factor) => factor,
            Self::Unity => 1.0,
        }
    }

    /// Propagator length over driver length, in `[0.25, 4]`.
    pub fn multiplier(self) -> f32 {
        match self {
            Self::Shorten(factor) => 1.0 / factor,
            Self::Unity => 1.0,
            Self::Lengthen(factor) => factor,
        }
    }

    /// Apply the ratio to a driver length.
    pub fn apply(self, driver_length_ms: f32) -> f32 {
        match self {
            Self::Shorten(factor) => driver_length_ms / factor,
            Self::Unity => driver_length_ms,
            Self::Lengthen(factor) => driver_length_ms * factor,
        }
    }
}

/// Map a ratio knob position to its propagation factor.
pub fn map_ratio(position: f32) -> f32 {
    Propagation::from_position(position).factor()
}

/// Propagator length for a given driver length and ratio knob position.
pub fn propagator_length(driver_length_ms: f32, position: f32) -> f32 {
    Propagation::from_position(position).apply(driver_length_ms)
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
