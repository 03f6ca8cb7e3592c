//! # Control Event Loop
//!
//! One pass per engine tick:
//!
//! 1. Feedback knob moved → driver feedback.
//! 2. Length *or* ratio knob moved → driver length, then the propagator
//!    from that fresh length.
//! 3. Tap interval measured → driver length from the tap, then the
//!    propagator.
//! 4. Hand both parameter sets to the engine.
//!
//! Each change gets at most one reaction per cycle, and nothing in a cycle
//! can fail.

use nih_plug::prelude::*;

use crate::config::PropagationConfig;
use crate::control::ControlState;
use crate::controller::DelayController;
use crate::engine::{AudioEngine, BYPASS_BUTTON, TAP_BUTTON};
use crate::error::Error;
use crate::routing::RoutingGraph;

/// Which reactions ran during one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reactions {
    pub feedback: bool,
    pub length: bool,
    pub tap: bool,
}

/// Drives the [`DelayController`] from control snapshots.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    controller: DelayController,
}

impl ControlLoop {
    pub fn new(config: &PropagationConfig) -> Self {
        Self {
            controller: DelayController::new(config),
        }
    }

    pub fn controller(&self) -> &DelayController {
        &self.controller
    }

    /// Run one cycle. `controls` is consumed: a snapshot belongs to exactly
    /// one cycle.
    pub fn cycle<E: AudioEngine>(&mut self, controls: ControlState, engine: &mut E) -> Reactions {
        let mut reactions = Reactions::default();

        if controls.feedback.changed {
            self.controller.set_feedback(controls.feedback.value);
            reactions.feedback = true;
        }

        if controls.driver_length.changed || controls.ratio.changed {
            let driver = self
                .controller
                .set_driver_length(controls.driver_length.value, &mut *engine);
            self.controller
                .set_propagator_from_ratio(driver, controls.ratio.value);
            reactions.length = true;
        }

        if let Some(tap) = controls.tap {
            self.controller
                .apply_tap(tap.interval_ms, controls.ratio.value, &mut *engine);
            reactions.tap = true;
        }

        engine.service(self.controller.driver(), self.controller.propagator());
        reactions
    }
}

/// Bring the effect up on `engine`: validate the configuration, declare the
/// delay-in-delay routing, register the footswitches and start the engine.
pub fn setup<E: AudioEngine>(config: &PropagationConfig, engine: &mut E) -> Result<ControlLoop, Error> {
    config.validate()?;

    RoutingGraph::delay_in_delay().declare(engine);
    engine.add_bypass_button(BYPASS_BUTTON);
    engine.add_tap_interval_button(TAP_BUTTON, true);
    engine.run()?;

    nih_log!(
        "propagation delay running: driver up to {} ms, propagator up to {} ms",
        config.max_delay_ms,
        config.max_propagation_ms()
    );
    Ok(ControlLoop::new(config))
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
