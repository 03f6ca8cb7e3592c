//! # Configuration
//!
//! Every fixed number the effect depends on lives here: delay ceilings,
//! the propagation factor limit, initial feedback amounts and the fixed
//! clean/effect mix of each delay line.
//!
//! Nothing in this module changes at runtime. The knobs only ever move
//! values *inside* the ranges declared here.

use thiserror::Error;

use crate::delay::{DelayLineSettings, MixLevels};

/// Longest driver delay, in milliseconds.
pub const MAX_DELAY_MS: f32 = 3000.0;

/// The propagator can run up to this many times longer (or shorter) than
/// the driver.
pub const MAX_PROPAGATION_FACTOR: f32 = 4.0;

/// Longest propagator delay: `MAX_DELAY_MS * MAX_PROPAGATION_FACTOR`.
pub const MAX_PROPAGATION_MS: f32 = MAX_DELAY_MS * MAX_PROPAGATION_FACTOR;

/// Driver feedback at power-up.
pub const DRIVER_FEEDBACK_INIT: f32 = 0.5;

/// Propagator feedback at power-up. The propagator has no feedback knob,
/// so this value holds for the lifetime of the effect.
pub const PROPAGATOR_FEEDBACK_INIT: f32 = 0.4;

/// Floor of the driver length knob. Tap tempo bypasses it.
pub const MIN_DRIVER_LENGTH_MS: f32 = 100.0;

/// Driver length before the first control cycle syncs it to the knob.
pub const INITIAL_DRIVER_LENGTH_MS: f32 = 500.0;

/// Problems found by [`PropagationConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The maximum delay must be a positive, finite number of milliseconds.
    #[error("maximum delay must be positive and finite, got {0} ms")]
    InvalidMaxDelay(f32),

    /// The length knob floor must sit below the ceiling.
    #[error("driver length floor ({floor_ms} ms) must be below the maximum delay ({max_ms} ms)")]
    FloorAboveMax {
        /// Configured floor.
        floor_ms: f32,
        /// Configured ceiling.
        max_ms: f32,
    },

    /// A propagation factor below 1 would swap the knob's directions.
    #[error("maximum propagation factor must be at least 1, got {0}")]
    InvalidPropagationFactor(f32),

    /// Feedback and mix amounts are gains in `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    GainOutOfRange {
        /// Which setting was rejected.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },
}

/// The complete set of fixed settings for both delay lines.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationConfig {
    /// Ceiling of the driver delay (and of the length knob), in ms.
    pub max_delay_ms: f32,
    /// Largest propagator/driver ratio in either direction.
    pub max_propagation_factor: f32,
    /// Floor of the driver length knob, in ms.
    pub min_driver_length_ms: f32,
    /// Driver length before the first control cycle, in ms.
    pub initial_driver_length_ms: f32,
    /// Initial driver feedback.
    pub driver_feedback: f32,
    /// Fixed propagator feedback.
    pub propagator_feedback: f32,
    /// Fixed driver mix. The clean part carries the dry signal to the host
    /// output.
    pub driver_mix: MixLevels,
    /// Fixed propagator mix. Its output only ever feeds the driver's aux
    /// return, so it runs fully wet. The effect level of `1 - feedback`
    /// keeps the propagator's gain at unity for sustained input, which
    /// keeps the combined loop stable for any driver feedback below 1.
    pub propagator_mix: MixLevels,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            max_delay_ms: MAX_DELAY_MS,
            max_propagation_factor: MAX_PROPAGATION_FACTOR,
            min_driver_length_ms: MIN_DRIVER_LENGTH_MS,
            initial_driver_length_ms: INITIAL_DRIVER_LENGTH_MS,
            driver_feedback: DRIVER_FEEDBACK_INIT,
            propagator_feedback: PROPAGATOR_FEEDBACK_INIT,
            driver_mix: MixLevels {
                clean: 1.0,
                effect: 0.5,
            },
            propagator_mix: MixLevels {
                clean: 0.0,
                effect: 1.0 - PROPAGATOR_FEEDBACK_INIT,
            },
        }
    }
}

impl PropagationConfig {
    /// Ceiling of the propagator delay line.
    pub fn max_propagation_ms(&self) -> f32 {
        self.max_delay_ms * self.max_propagation_factor
    }

    /// Check that the settings describe a usable effect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_delay_ms.is_finite() || self.max_delay_ms <= 0.0 {
            return Err(ConfigError::InvalidMaxDelay(self.max_delay_ms));
        }
        if self.min_driver_length_ms.is_nan() || self.min_driver_length_ms >= self.max_delay_ms {
            return Err(ConfigError::FloorAboveMax {
                floor_ms: self.min_driver_length_ms,
                max_ms: self.max_delay_ms,
            });
        }
        if !self.max_propagation_factor.is_finite() || self.max_propagation_factor < 1.0 {
            return Err(ConfigError::InvalidPropagationFactor(
                self.max_propagation_factor,
            ));
        }

        let gains = [
            ("driver feedback", self.driver_feedback),
            ("propagator feedback", self.propagator_feedback),
            ("driver clean mix", self.driver_mix.clean),
            ("driver effect mix", self.driver_mix.effect),
            ("propagator clean mix", self.propagator_mix.clean),
            ("propagator effect mix", self.propagator_mix.effect),
        ];
        for (name, value) in gains {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::GainOutOfRange { name, value });
            }
        }

        Ok(())
    }

    /// Construction settings for the driver: the only line with its aux
    /// send/receive pair switched on.
    pub fn driver_settings(&self) -> DelayLineSettings {
        DelayLineSettings {
            initial_length_ms: self.initial_driver_length_ms,
            max_length_ms: self.max_delay_ms,
            feedback: self.driver_feedback,
            mix: self.driver_mix,
            aux_loop_enabled: true,
        }
    }

    /// Construction settings for the propagator. It starts at the driver's
    /// length, which is where a centred ratio knob puts it.
    pub fn propagator_settings(&self) -> DelayLineSettings {
        DelayLineSettings {
            initial_length_ms: self.initial_driver_length_ms,
            max_length_ms: self.max_propagation_ms(),
            feedback: self.propagator_feedback,
            mix: self.propagator_mix,
            aux_loop_enabled: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(PropagationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_max_propagation_is_derived() {
        let config = PropagationConfig::default();
        assert!((config.max_propagation_ms() - 12000.0).abs() < 1e-3);
        assert!((MAX_PROPAGATION_MS - 12000.0).abs() < 1e-3);
    }

    #[test]
    fn test_settings_carry_constants() {
        let config = PropagationConfig::default();

        let driver = config.driver_settings();
        assert!((driver.max_length_ms - 3000.0).abs() < 1e-3);
        assert!((driver.feedback - 0.5).abs() < 1e-6);
        assert!(driver.aux_loop_enabled);

        let propagator = config.propagator_settings();
        assert!((propagator.max_length_ms - 12000.0).abs() < 1e-3);
        assert!((propagator.feedback - 0.4).abs() < 1e-6);
        assert!(!propagator.aux_loop_enabled);
    }

    #[test]
    fn test_rejects_floor_above_max() {
        let config = PropagationConfig {
            min_driver_length_ms: 4000.0,
            ..PropagationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FloorAboveMax { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_factor_and_gain() {
        let config = PropagationConfig {
            max_propagation_factor: 0.5,
            ..PropagationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidPropagationFactor(0.5))
        );

        let config = PropagationConfig {
            driver_feedback: 1.2,
            ..PropagationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GainOutOfRange {
                name: "driver feedback",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_nan_max_delay() {
        let config = PropagationConfig {
            max_delay_ms: f32::NAN,
            ..PropagationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxDelay(_))
        ));
    }
}
