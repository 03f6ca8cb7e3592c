//! # Host Engine and Controls
//!
//! The plugin plays both external roles the control layer expects:
//!
//! - [`HostControls`] is the control surface. It watches the plugin
//!   parameters, detects knob moves and tap presses, and produces one
//!   [`ControlState`] per audio block.
//! - [`HostEngine`] is the audio engine. It owns the sample buffers,
//!   latches the delay-line parameters once per block in
//!   [`service`](AudioEngine::service), and runs the routing graph sample by
//!   sample.
//!
//! ## Per-Sample Routing
//!
//! Every port holds one sample value per tick. A tick:
//!
//! 1. **Read** each delay line's delayed sample from its ring buffer.
//! 2. **Route**: walk the graph in declaration order, adding each source
//!    port's value into its destination port. A main output is
//!    `clean * main_input + effect * delayed`; an aux send is the raw
//!    delayed sample.
//! 3. **Write** each line's main input plus its feedback signal into its
//!    ring buffer. The driver's feedback signal is whatever arrived at its
//!    aux receive; a line without an aux loop feeds back its own delayed
//!    sample.
//! 4. **Advance** both write heads.
//!
//! Reading before writing is what breaks the loop between the driver and
//! the propagator: each line's output this tick depends only on what was
//! written in earlier ticks.

use nih_plug::prelude::*;

use crate::config::PropagationConfig;
use crate::control::{ControlState, Knob, TapButton};
use crate::delay::{DelayLine, MixLevels};
use crate::dsp::delay_line::{ms_to_samples, DelayBuffer};
use crate::dsp::smoother::OnePoleSmoother;
use crate::engine::{AudioEngine, ButtonId, TapIndicator};
use crate::params::PropagationParams;
use crate::routing::{Port, Route, RoutingError, RoutingGraph};
use crate::tap::TapTempo;

/// Glide time of the delay read heads after a length change.
const LENGTH_GLIDE_MS: f32 = 40.0;

/// Shortest read distance. A zero-sample read would return the slot about
/// to be overwritten, i.e. audio from a full buffer ago.
const MIN_READ_SAMPLES: f32 = 1.0;

/// Level below which the tail is considered silent (-60 dB).
const TAIL_FLOOR_LOG10: f32 = -3.0;

/// Sample-side state of one delay line.
struct LineState {
    buffer: DelayBuffer,
    read_head: OnePoleSmoother,
    target_samples: f32,
    feedback: f32,
    mix: MixLevels,
    aux_loop_enabled: bool,
    /// Sample read this tick.
    delayed: f32,
}

impl LineState {
    fn new(line: &DelayLine, sample_rate: f32) -> Self {
        let target_samples = ms_to_samples(line.length_ms(), sample_rate).max(MIN_READ_SAMPLES);
        let mut read_head = OnePoleSmoother::new(target_samples);
        read_head.set_time_ms(LENGTH_GLIDE_MS, sample_rate);

        Self {
            buffer: DelayBuffer::for_duration(line.max_length_ms(), sample_rate),
            read_head,
            target_samples,
            feedback: line.feedback(),
            mix: line.mix(),
            aux_loop_enabled: line.aux_loop_enabled(),
            delayed: 0.0,
        }
    }

    fn latch(&mut self, line: &DelayLine, sample_rate: f32) {
        self.target_samples = ms_to_samples(line.length_ms(), sample_rate).max(MIN_READ_SAMPLES);
        self.feedback = line.feedback();
        self.mix = line.mix();
        self.aux_loop_enabled = line.aux_loop_enabled();
    }

    fn read(&mut self) {
        let position = self.read_head.next(self.target_samples);
        self.delayed = self.buffer.read(position);
    }

    fn main_output(&self, main_input: f32) -> f32 {
        self.mix.clean * main_input + self.mix.effect * self.delayed
    }

    fn write(&mut self, main_input: f32, aux_receive: f32) {
        let returned = if self.aux_loop_enabled {
            aux_receive
        } else {
            self.delayed
        };
        self.buffer.write(main_input + self.feedback * returned);
        self.buffer.advance();
    }

    /// Farthest the read head sits from the write head, now or once it has
    /// settled.
    fn longest_read_samples(&self) -> f32 {
        self.target_samples.max(self.read_head.current())
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.read_head.reset(self.target_samples);
        self.delayed = 0.0;
    }
}

/// Trips around a loop with gain `feedback` until it is below
/// [`TAIL_FLOOR_LOG10`]. `None` when the loop never decays.
fn decay_trips(feedback: f32) -> Option<f32> {
    if feedback >= 1.0 {
        None
    } else if feedback > 0.001 {
        Some(TAIL_FLOOR_LOG10 / feedback.log10())
    } else {
        // No recirculation: the line still plays out once.
        Some(1.0)
    }
}

/// The plugin's [`AudioEngine`].
pub struct HostEngine {
    sample_rate: f32,
    driver: LineState,
    propagator: LineState,
    /// Routes collected by `route_audio` until `run` validates them.
    declared: Vec<Route>,
    graph: Option<RoutingGraph>,
    bypass_button: Option<ButtonId>,
    tap_button: Option<ButtonId>,
    led_sync: bool,
    tap_blink_rate_ms: Option<f32>,
    bypassed: bool,
}

impl HostEngine {
    /// Allocate both ring buffers for `sample_rate`. Buffers are sized for
    /// each line's maximum length.
    pub fn new(config: &PropagationConfig, sample_rate: f32) -> Self {
        let driver = DelayLine::new(config.driver_settings());
        let propagator = DelayLine::new(config.propagator_settings());

        Self {
            sample_rate,
            driver: LineState::new(&driver, sample_rate),
            propagator: LineState::new(&propagator, sample_rate),
            declared: Vec::new(),
            graph: None,
            bypass_button: None,
            tap_button: None,
            led_sync: false,
            tap_blink_rate_ms: None,
            bypassed: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.graph.is_some()
    }

    /// Apply the bypass footswitch. Ignored unless a bypass button was
    /// registered.
    pub fn set_bypassed(&mut self, bypassed: bool) {
        if self.bypass_button.is_some() {
            self.bypassed = bypassed;
        }
    }

    /// Current tap LED period, if the tap button was registered with LED
    /// sync and a length has been reported.
    pub fn tap_blink_rate_ms(&self) -> Option<f32> {
        self.tap_blink_rate_ms
    }

    /// Delay the engine is currently heading toward on each line, in ms.
    #[cfg(test)]
    fn target_lengths_ms(&self) -> (f32, f32) {
        let to_ms = |samples: f32| samples * 1000.0 / self.sample_rate;
        (
            to_ms(self.driver.target_samples),
            to_ms(self.propagator.target_samples),
        )
    }

    /// Process one input sample through the routing graph. Before `run`
    /// (or while bypassed) the input is passed straight through.
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let Some(graph) = &self.graph else {
            return input;
        };

        // ── Step 1: Read ──────────────────────────────────────────────
        // Each read head glides one sample toward its target distance and
        // picks up what was written that many samples ago. Nothing written
        // this tick is visible yet.
        self.driver.read();
        self.propagator.read();

        // ── Step 2: Route ─────────────────────────────────────────────
        // Ports start silent every tick. Destinations sum whatever is
        // routed into them, so two routes into one port would mix.
        let mut ports = [0.0_f32; Port::COUNT];
        ports[Port::HostInput.index()] = input;

        // The graph guarantees a line's input is filled before its output
        // is read, so `main_output` sees this tick's main input.
        for route in graph.routes() {
            let value = match route.source {
                Port::HostInput => input,
                Port::DriverMainOutput => self
                    .driver
                    .main_output(ports[Port::DriverMainInput.index()]),
                Port::DriverAuxSend => self.driver.delayed,
                Port::PropagatorMainOutput => self
                    .propagator
                    .main_output(ports[Port::PropagatorMainInput.index()]),
                // Validation only lets source ports through.
                _ => 0.0,
            };
            ports[route.destination.index()] += value;
        }

        // ── Step 3: Write ─────────────────────────────────────────────
        // The driver recirculates its aux receive, i.e. the propagator's
        // output. The propagator has no aux loop and recirculates its own
        // delayed sample, so its aux argument is unused.
        self.driver.write(
            ports[Port::DriverMainInput.index()],
            ports[Port::DriverAuxReceive.index()],
        );
        self.propagator.write(
            ports[Port::PropagatorMainInput.index()],
            0.0,
        );

        // ── Step 4: Output ────────────────────────────────────────────
        // Bypass only swaps what leaves the plugin. Both lines were written
        // above, so the repeats keep circulating underneath.
        if self.bypassed {
            input
        } else {
            ports[Port::HostOutput.index()]
        }
    }

    /// Samples until the repeats have decayed below -60 dB.
    ///
    /// Two loops ring at once. One trip around the driver's loop takes the
    /// driver delay plus the propagator delay and loses a factor of the
    /// driver's feedback. Inside it, the propagator recirculates its own
    /// output every propagator delay and loses a factor of its feedback.
    /// The estimate lets the driver loop decay first and then gives the
    /// propagator's last repeat its own time to die away, which never
    /// undershoots either loop.
    pub fn tail_samples(&self) -> u32 {
        let driver_samples = self.driver.longest_read_samples();
        let propagator_samples = self.propagator.longest_read_samples();

        let (Some(driver_trips), Some(propagator_trips)) = (
            decay_trips(self.driver.feedback),
            decay_trips(self.propagator.feedback),
        ) else {
            return u32::MAX;
        };

        let tail = driver_trips * (driver_samples + propagator_samples)
            + propagator_trips * propagator_samples;
        tail.min(u32::MAX as f32) as u32
    }

    /// Silence both lines.
    pub fn clear(&mut self) {
        self.driver.clear();
        self.propagator.clear();
    }
}

impl TapIndicator for HostEngine {
    fn set_tap_blink_rate_ms(&mut self, period_ms: f32) {
        if self.tap_button.is_some() && self.led_sync {
            self.tap_blink_rate_ms = Some(period_ms);
        }
    }
}

impl AudioEngine for HostEngine {
    fn route_audio(&mut self, source: Port, destination: Port) {
        if self.is_running() {
            nih_warn!("ignoring route {source:?} -> {destination:?}: routing is fixed once running");
            return;
        }
        self.declared.push(Route::new(source, destination));
    }

    fn add_bypass_button(&mut self, id: ButtonId) {
        self.bypass_button = Some(id);
    }

    fn add_tap_interval_button(&mut self, id: ButtonId, led_sync: bool) {
        self.tap_button = Some(id);
        self.led_sync = led_sync;
    }

    fn run(&mut self) -> Result<(), RoutingError> {
        let graph = RoutingGraph::from_routes(&self.declared)?;
        self.declared.clear();
        self.graph = Some(graph);
        Ok(())
    }

    fn service(&mut self, driver: &DelayLine, propagator: &DelayLine) {
        self.driver.latch(driver, self.sample_rate);
        self.propagator.latch(propagator, self.sample_rate);
    }
}

/// Turns parameter values into per-block [`ControlState`]s.
pub struct HostControls {
    feedback: Knob,
    driver_length: Knob,
    ratio: Knob,
    tap: TapTempo,
    tap_held: bool,
}

impl HostControls {
    /// Start from the current parameter values, all flagged as changed so
    /// the first cycle applies them.
    pub fn new(params: &PropagationParams, config: &PropagationConfig) -> Self {
        Self {
            feedback: Knob::changed(params.feedback.value()),
            driver_length: Knob::changed(params.length.value()),
            ratio: Knob::changed(params.ratio.value()),
            tap: TapTempo::new(config.max_delay_ms),
            tap_held: params.tap.value(),
        }
    }

    /// Sample the parameters at `now_ms` and build this block's snapshot.
    pub fn poll(&mut self, params: &PropagationParams, now_ms: f64) -> ControlState {
        self.poll_values(
            params.feedback.value(),
            params.length.value(),
            params.ratio.value(),
            params.tap.value(),
            now_ms,
        )
    }

    /// Build this block's snapshot from raw control values.
    ///
    /// Each knob reports a move once, on the first poll that sees it. A tap
    /// counts on the rising edge of `tap_down` only; holding the switch
    /// down does nothing further.
    pub fn poll_values(
        &mut self,
        feedback: f32,
        length: f32,
        ratio: f32,
        tap_down: bool,
        now_ms: f64,
    ) -> ControlState {
        self.feedback.set(feedback);
        self.driver_length.set(length);
        self.ratio.set(ratio);

        if tap_down && !self.tap_held {
            self.tap.press(now_ms);
        }
        self.tap_held = tap_down;

        ControlState {
            feedback: self.feedback.take(),
            driver_length: self.driver_length.take(),
            ratio: self.ratio.take(),
            tap: self.tap.take_tap(),
        }
    }

    /// Drop any half-measured tap, e.g. after the transport stops.
    pub fn reset_tap(&mut self) {
        self.tap.reset();
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TapEvent;
    use crate::event_loop::setup;

    const SAMPLE_RATE: f32 = 1000.0;

    /// A running engine at 1 kHz, so 1 ms == 1 sample.
    fn running_engine() -> HostEngine {
        let config = PropagationConfig::default();
        let mut engine = HostEngine::new(&config, SAMPLE_RATE);
        setup(&config, &mut engine).unwrap();
        engine
    }

    fn set_lengths(engine: &mut HostEngine, driver_ms: f32, propagator_ms: f32) {
        let config = PropagationConfig::default();
        let mut driver = DelayLine::new(config.driver_settings());
        let mut propagator = DelayLine::new(config.propagator_settings());
        driver.set_length_ms(driver_ms);
        propagator.set_length_ms(propagator_ms);
        engine.service(&driver, &propagator);
        engine.clear();
    }

    #[test]
    fn test_passthrough_before_run() {
        let config = PropagationConfig::default();
        let mut engine = HostEngine::new(&config, SAMPLE_RATE);
        assert!((engine.process_sample(0.3) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_setup_freezes_routing() {
        let mut engine = running_engine();
        assert!(engine.is_running());

        engine.route_audio(Port::HostInput, Port::PropagatorMainInput);
        assert_eq!(
            engine.graph.as_ref().map(|g| g.routes().len()),
            Some(4),
            "A late route must not change the graph"
        );
    }

    #[test]
    fn test_run_rejects_invalid_routes() {
        let config = PropagationConfig::default();
        let mut engine = HostEngine::new(&config, SAMPLE_RATE);
        engine.route_audio(Port::HostOutput, Port::DriverMainInput);
        assert_eq!(engine.run(), Err(RoutingError::NotASource(Port::HostOutput)));
        assert!(!engine.is_running());
    }

    /// An impulse comes out once after the driver delay, then again after
    /// a full trip through the propagator and back through the driver.
    #[test]
    fn test_impulse_travels_through_both_lines() {
        let mut engine = running_engine();
        set_lengths(&mut engine, 10.0, 5.0);

        let mut output = Vec::new();
        output.push(engine.process_sample(1.0));
        for _ in 0..40 {
            output.push(engine.process_sample(0.0));
        }

        // Dry impulse at t = 0, clean mix 1.0.
        assert!((output[0] - 1.0).abs() < 1e-6);
        // First echo at the driver length, effect mix 0.5.
        assert!((output[10] - 0.5).abs() < 1e-6, "Expected first echo, got {}", output[10]);
        // Second echo: driver (10) + propagator (5) + driver (10) = 25.
        // Gain: propagator effect 0.6 * driver feedback 0.5 * effect 0.5.
        let expected = 0.6 * 0.5 * 0.5;
        assert!(
            (output[25] - expected).abs() < 1e-6,
            "Expected {expected} at t=25, got {}",
            output[25]
        );
        // Nothing in between.
        for (t, sample) in output.iter().enumerate().take(25).skip(11) {
            assert!(sample.abs() < 1e-6, "Unexpected output {sample} at t={t}");
        }
    }

    #[test]
    fn test_bypass_outputs_dry_signal() {
        let mut engine = running_engine();
        set_lengths(&mut engine, 10.0, 5.0);
        engine.set_bypassed(true);

        engine.process_sample(1.0);
        for _ in 0..9 {
            engine.process_sample(0.0);
        }
        assert!(engine.process_sample(0.0).abs() < 1e-6, "Bypass should hide the echo");

        engine.set_bypassed(false);
        // The propagator's echo is still in the loop and comes out at t=25.
        for _ in 11..25 {
            engine.process_sample(0.0);
        }
        assert!(engine.process_sample(0.0).abs() > 0.0, "Trails should survive bypass");
    }

    #[test]
    fn test_blink_rate_follows_led_sync() {
        let mut engine = running_engine();
        engine.set_tap_blink_rate_ms(450.0);
        assert_eq!(engine.tap_blink_rate_ms(), Some(450.0));

        let config = PropagationConfig::default();
        let mut unsynced = HostEngine::new(&config, SAMPLE_RATE);
        unsynced.add_tap_interval_button(ButtonId(1), false);
        unsynced.set_tap_blink_rate_ms(450.0);
        assert_eq!(unsynced.tap_blink_rate_ms(), None);
    }

    #[test]
    fn test_service_latches_lengths() {
        let mut engine = running_engine();
        set_lengths(&mut engine, 450.0, 112.5);

        let (driver, propagator) = engine.target_lengths_ms();
        assert!((driver - 450.0).abs() < 1e-3);
        assert!((propagator - 112.5).abs() < 1e-3);
    }

    #[test]
    fn test_tail_covers_round_trips() {
        let mut engine = running_engine();
        set_lengths(&mut engine, 100.0, 100.0);

        // Driver: log10(0.001) / log10(0.5) ≈ 9.97 trips of 200 samples.
        // Propagator: log10(0.001) / log10(0.4) ≈ 7.54 trips of 100 samples.
        let tail = engine.tail_samples();
        assert!((2740..=2755).contains(&tail), "Unexpected tail {tail}");
    }

    /// With the driver's feedback at zero the propagator still rings.
    #[test]
    fn test_tail_includes_propagator_recirculation() {
        let mut engine = running_engine();
        let config = PropagationConfig::default();
        let mut driver = DelayLine::new(config.driver_settings());
        let mut propagator = DelayLine::new(config.propagator_settings());
        driver.set_length_ms(100.0);
        driver.set_feedback(0.0);
        propagator.set_length_ms(100.0);
        engine.service(&driver, &propagator);
        engine.clear();

        // One driver trip (200) plus ≈ 7.54 propagator trips (754).
        let tail = engine.tail_samples();
        assert!((945..=960).contains(&tail), "Unexpected tail {tail}");
    }

    /// While the read head is still gliding down from a long delay, the
    /// tail covers the longer distance.
    #[test]
    fn test_tail_covers_gliding_read_head() {
        let mut engine = running_engine();
        set_lengths(&mut engine, 1000.0, 1000.0);
        let settled = engine.tail_samples();

        let config = PropagationConfig::default();
        let mut driver = DelayLine::new(config.driver_settings());
        let mut propagator = DelayLine::new(config.propagator_settings());
        driver.set_length_ms(100.0);
        propagator.set_length_ms(100.0);
        engine.service(&driver, &propagator);

        assert_eq!(engine.tail_samples(), settled);
    }

    #[test]
    fn test_controls_first_poll_reports_everything() {
        let params = PropagationParams::default();
        let config = PropagationConfig::default();
        let mut controls = HostControls::new(&params, &config);

        let first = controls.poll(&params, 0.0);
        assert!(first.feedback.changed && first.driver_length.changed && first.ratio.changed);
        assert!(first.tap.is_none());

        let second = controls.poll(&params, 10.0);
        assert!(!(second.feedback.changed || second.driver_length.changed || second.ratio.changed));
    }

    fn fresh_controls() -> HostControls {
        let params = PropagationParams::default();
        let mut controls = HostControls::new(&params, &PropagationConfig::default());
        // Swallow the start-up sync.
        controls.poll_values(0.5, 0.25, 0.5, false, 0.0);
        controls
    }

    #[test]
    fn test_controls_tap_on_rising_edges() {
        let mut controls = fresh_controls();

        let first_press = controls.poll_values(0.5, 0.25, 0.5, true, 0.0);
        assert_eq!(first_press.tap, None, "One press is not an interval yet");

        let released = controls.poll_values(0.5, 0.25, 0.5, false, 100.0);
        assert_eq!(released.tap, None);

        let second_press = controls.poll_values(0.5, 0.25, 0.5, true, 450.0);
        assert_eq!(second_press.tap, Some(TapEvent { interval_ms: 450.0 }));
    }

    #[test]
    fn test_controls_held_tap_adds_no_presses() {
        let mut controls = fresh_controls();

        controls.poll_values(0.5, 0.25, 0.5, true, 0.0);
        controls.poll_values(0.5, 0.25, 0.5, false, 100.0);
        let tapped = controls.poll_values(0.5, 0.25, 0.5, true, 450.0);
        assert!(tapped.tap.is_some());

        // Still held, well past the debounce window.
        for now_ms in [600.0, 900.0, 1200.0] {
            let held = controls.poll_values(0.5, 0.25, 0.5, true, now_ms);
            assert_eq!(held.tap, None, "Held switch produced a tap at {now_ms} ms");
        }

        // Releasing and pressing again measures from the last real press.
        controls.poll_values(0.5, 0.25, 0.5, false, 1300.0);
        let retapped = controls.poll_values(0.5, 0.25, 0.5, true, 1400.0);
        assert_eq!(retapped.tap, Some(TapEvent { interval_ms: 950.0 }));
    }

    #[test]
    fn test_controls_flag_knob_move_once() {
        let mut controls = fresh_controls();

        let moved = controls.poll_values(0.5, 0.7, 0.5, false, 10.0);
        assert!(moved.driver_length.changed);
        assert!((moved.driver_length.value - 0.7).abs() < 1e-6);
        assert!(!(moved.feedback.changed || moved.ratio.changed));

        let after = controls.poll_values(0.5, 0.7, 0.5, false, 20.0);
        assert!(!after.driver_length.changed);
        assert!((after.driver_length.value - 0.7).abs() < 1e-6);
    }
}
