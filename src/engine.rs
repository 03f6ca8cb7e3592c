//! # Audio Engine Interface
//!
//! The control layer never touches samples. It talks to whatever owns the
//! audio through these traits: declare routes and buttons at start-up, then
//! hand over the two delay lines' parameters once per control cycle.
//!
//! The plugin's implementation is [`HostEngine`](crate::host::HostEngine).
//! Tests use small recording engines.

use crate::delay::DelayLine;
use crate::routing::{Port, RoutingError};

/// Identifies a footswitch on the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonId(pub u8);

/// Footswitch that toggles the effect in and out.
pub const BYPASS_BUTTON: ButtonId = ButtonId(0);

/// Footswitch used for tap tempo.
pub const TAP_BUTTON: ButtonId = ButtonId(1);

/// Receiver for tap-tempo LED updates.
pub trait TapIndicator {
    /// Blink the tap LED once every `period_ms`.
    fn set_tap_blink_rate_ms(&mut self, period_ms: f32);
}

/// Everything the control layer needs from the audio engine.
pub trait AudioEngine: TapIndicator {
    /// Connect two ports. Only valid before [`run`](Self::run).
    fn route_audio(&mut self, source: Port, destination: Port);

    /// Register the bypass footswitch. Initialization only.
    fn add_bypass_button(&mut self, id: ButtonId);

    /// Register the tap-tempo footswitch. With `led_sync`, the tap LED
    /// follows [`TapIndicator::set_tap_blink_rate_ms`]. Initialization only.
    fn add_tap_interval_button(&mut self, id: ButtonId, led_sync: bool);

    /// Freeze the declared routing and start processing. Called once.
    fn run(&mut self) -> Result<(), RoutingError>;

    /// Called once per control cycle, after every parameter write of that
    /// cycle. The engine picks up the current delay-line parameters here.
    fn service(&mut self, driver: &DelayLine, propagator: &DelayLine);
}
