//! # Delay Parameter Controller
//!
//! Owns the driver and propagator parameter sets and turns control
//! positions into their lengths and feedback.
//!
//! The propagator has no length knob of its own. Its length is always
//! `ratio(driver length)`, so every change to the driver length is
//! followed by a propagator update in the same call chain. To make that
//! ordering impossible to get wrong, the propagator can only be derived
//! from a [`DriverLength`], and a `DriverLength` can only come out of a
//! driver write.

use crate::config::PropagationConfig;
use crate::delay::DelayLine;
use crate::engine::TapIndicator;
use crate::ratio::Propagation;

/// A driver length that has just been written.
///
/// Returned by [`DelayController::set_driver_length`] and
/// [`DelayController::apply_tap`]; consumed by
/// [`DelayController::set_propagator_from_ratio`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverLength(f32);

impl DriverLength {
    pub fn ms(self) -> f32 {
        self.0
    }
}

/// Linear map of the length knob onto `[floor_ms, max_ms]`. A NaN position
/// reads as fully counter-clockwise.
pub fn driver_length_for_position(position: f32, floor_ms: f32, max_ms: f32) -> f32 {
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    };
    floor_ms + position * (max_ms - floor_ms)
}

/// The two delay lines and the rules that link them.
#[derive(Debug, Clone)]
pub struct DelayController {
    driver: DelayLine,
    propagator: DelayLine,
    min_driver_length_ms: f32,
    max_propagation_factor: f32,
}

impl DelayController {
    pub fn new(config: &PropagationConfig) -> Self {
        Self {
            driver: DelayLine::new(config.driver_settings()),
            propagator: DelayLine::new(config.propagator_settings()),
            min_driver_length_ms: config.min_driver_length_ms,
            max_propagation_factor: config.max_propagation_factor,
        }
    }

    pub fn driver(&self) -> &DelayLine {
        &self.driver
    }

    pub fn propagator(&self) -> &DelayLine {
        &self.propagator
    }

    /// Feedback knob → driver feedback, one to one.
    pub fn set_feedback(&mut self, position: f32) {
        self.driver.set_feedback(position);
    }

    /// Length knob → driver length.
    ///
    /// The knob covers `[min_driver_length_ms, max_delay_ms]` linearly, so
    /// even fully counter-clockwise the driver never collapses to zero. The
    /// tap LED is told about the new length.
    ///
    /// The propagator is *not* updated here; pass the returned length to
    /// [`set_propagator_from_ratio`](Self::set_propagator_from_ratio).
    pub fn set_driver_length<T: TapIndicator>(
        &mut self,
        position: f32,
        indicator: &mut T,
    ) -> DriverLength {
        let length_ms =
            driver_length_for_position(position, self.min_driver_length_ms, self.driver.max_length_ms());

        // The line clamps again on write; the LED blinks at what was stored,
        // not at what was asked for.
        let written = self.write_driver(length_ms);
        indicator.set_tap_blink_rate_ms(written.ms());
        written
    }

    /// Derive and write the propagator length from a driver length that was
    /// just written. Returns the stored propagator length.
    pub fn set_propagator_from_ratio(&mut self, driver: DriverLength, ratio_position: f32) -> f32 {
        // Left of centre divides, right of centre multiplies. A 3 s driver
        // fully clockwise asks for exactly the propagator's 12 s maximum.
        let length_ms = Propagation::with_max_factor(ratio_position, self.max_propagation_factor)
            .apply(driver.ms())
            .clamp(0.0, self.propagator.max_length_ms());
        self.propagator.set_length_ms(length_ms)
    }

    /// Tap tempo → driver length, then propagator.
    ///
    /// The tap interval skips the knob's floor: a 60 ms tap gives a 60 ms
    /// driver. The delay line's own clamp still applies.
    pub fn apply_tap<T: TapIndicator>(
        &mut self,
        interval_ms: f32,
        ratio_position: f32,
        indicator: &mut T,
    ) -> DriverLength {
        // No floor here, but a tap longer than the driver's maximum is
        // still clamped by the line.
        let written = self.write_driver(interval_ms);
        indicator.set_tap_blink_rate_ms(written.ms());
        self.set_propagator_from_ratio(written, ratio_position);
        written
    }

    fn write_driver(&mut self, length_ms: f32) -> DriverLength {
        DriverLength(self.driver.set_length_ms(length_ms))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Remembers every blink rate it was given.
    #[derive(Default)]
    struct Led {
        rates: Vec<f32>,
    }

    impl TapIndicator for Led {
        fn set_tap_blink_rate_ms(&mut self, period_ms: f32) {
            self.rates.push(period_ms);
        }
    }

    fn controller() -> DelayController {
        DelayController::new(&PropagationConfig::default())
    }

    #[test]
    fn test_length_knob_endpoints() {
        let mut c = controller();
        let mut led = Led::default();

        let min = c.set_driver_length(0.0, &mut led);
        assert!((min.ms() - 100.0).abs() < 1e-3, "Expected 100 ms, got {}", min.ms());

        let max = c.set_driver_length(1.0, &mut led);
        assert!((max.ms() - 3000.0).abs() < 1e-3, "Expected 3000 ms, got {}", max.ms());
    }

    #[test]
    fn test_length_knob_is_linear() {
        let mut c = controller();
        let mut led = Led::default();

        // 100 + 0.5 * (3000 - 100) = 1550
        let mid = c.set_driver_length(0.5, &mut led);
        assert!((mid.ms() - 1550.0).abs() < 1e-2);
        assert!((c.driver().length_ms() - 1550.0).abs() < 1e-2);
    }

    #[test]
    fn test_length_knob_informs_indicator() {
        let mut c = controller();
        let mut led = Led::default();

        c.set_driver_length(1.0, &mut led);
        assert_eq!(led.rates.len(), 1);
        assert!((led.rates[0] - 3000.0).abs() < 1e-3);
    }

    /// The propagator follows whatever driver length it is handed.
    #[test]
    fn test_propagator_reads_new_driver_length() {
        let mut c = controller();
        let mut led = Led::default();

        let first = c.set_driver_length(0.0, &mut led);
        c.set_propagator_from_ratio(first, 1.0);
        assert!((c.propagator().length_ms() - 400.0).abs() < 1e-2);

        let second = c.set_driver_length(1.0, &mut led);
        let propagator = c.set_propagator_from_ratio(second, 1.0);
        assert!(
            (propagator - 12000.0).abs() < 1e-2,
            "Expected 12000 ms from the new driver length, got {propagator}"
        );
    }

    #[test]
    fn test_tap_skips_floor_and_updates_propagator() {
        let mut c = controller();
        let mut led = Led::default();

        let driver = c.apply_tap(60.0, 0.5, &mut led);
        assert!((driver.ms() - 60.0).abs() < 1e-3);
        assert!((c.propagator().length_ms() - 60.0).abs() < 1e-3);
        assert_eq!(led.rates, vec![60.0]);
    }

    #[test]
    fn test_tap_is_clamped_by_delay_line() {
        let mut c = controller();
        let mut led = Led::default();

        let driver = c.apply_tap(4500.0, 1.0, &mut led);
        assert!((driver.ms() - 3000.0).abs() < 1e-3);
        assert!((c.propagator().length_ms() - 12000.0).abs() < 1e-2);
        assert!((led.rates[0] - 3000.0).abs() < 1e-3);
    }

    #[test]
    fn test_tap_with_shortening_ratio() {
        let mut c = controller();
        let mut led = Led::default();

        c.apply_tap(450.0, 0.0, &mut led);
        assert!((c.driver().length_ms() - 450.0).abs() < 1e-3);
        assert!((c.propagator().length_ms() - 112.5).abs() < 1e-3);
    }

    #[test]
    fn test_feedback_is_identity() {
        let mut c = controller();
        c.set_feedback(0.8);
        assert!((c.driver().feedback() - 0.8).abs() < 1e-6);
        assert!((c.propagator().feedback() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_nan_length_position_reads_as_floor() {
        let mut c = controller();
        let mut led = Led::default();

        let driver = c.set_driver_length(f32::NAN, &mut led);
        assert!((driver.ms() - 100.0).abs() < 1e-3);
    }
}
