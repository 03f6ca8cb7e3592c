//! # Plugin Parameters
//!
//! The host-facing controls. The three knobs are exposed as raw `[0, 1]`
//! positions, exactly what a potentiometer on a pedal would report; the
//! control loop does the mapping to milliseconds and ratios. Their display
//! strings show the mapped value so the DAW still reads in musical units.
//!
//! None of the knobs are smoothed here. Length changes are smoothed on the
//! read head inside the engine, and feedback changes are small enough
//! per block not to click.

use std::sync::Arc;

use nih_plug::prelude::*;

use crate::config::{DRIVER_FEEDBACK_INIT, MAX_DELAY_MS, MIN_DRIVER_LENGTH_MS};
use crate::controller::driver_length_for_position;
use crate::ratio::{Propagation, CENTRE};

/// Length knob position at power-up.
pub const DEFAULT_LENGTH_POSITION: f32 = 0.25;

/// All user-facing parameters of the Propagation Delay.
#[derive(Params)]
pub struct PropagationParams {
    /// **Feedback**: how much of the driver's output returns through the
    /// propagator. Maps one to one onto the driver's feedback coefficient.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    /// **Length**: the driver delay, from 100 ms to 3 s.
    #[id = "length"]
    pub length: FloatParam,

    /// **Ratio**: propagator length relative to the driver. Centre is
    /// equal length; left shortens down to 1/4, right lengthens up to 4×.
    #[id = "ratio"]
    pub ratio: FloatParam,

    /// **Tap**: momentary footswitch. The time between two presses
    /// becomes the driver length.
    #[id = "tap"]
    pub tap: BoolParam,

    /// **Bypass**: the host's bypass switch. The delay lines keep running
    /// so repeats are still there when the effect comes back in.
    #[id = "bypass"]
    pub bypass: BoolParam,
}

impl Default for PropagationParams {
    fn default() -> Self {
        Self {
            feedback: FloatParam::new(
                "Feedback",
                DRIVER_FEEDBACK_INIT,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            length: FloatParam::new(
                "Length",
                DEFAULT_LENGTH_POSITION,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_value_to_string(Arc::new(|position: f32| {
                let ms = driver_length_for_position(position, MIN_DRIVER_LENGTH_MS, MAX_DELAY_MS);
                format!("{ms:.0} ms")
            })),

            ratio: FloatParam::new("Ratio", CENTRE, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_value_to_string(Arc::new(|position: f32| {
                    let multiplier = Propagation::from_position(position).multiplier();
                    format!("x{multiplier:.2}")
                })),

            tap: BoolParam::new("Tap", false),

            bypass: BoolParam::new("Bypass", false).make_bypass(),
        }
    }
}
