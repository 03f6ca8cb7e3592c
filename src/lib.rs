//! # Propagation Delay: A Delay Inside a Delay
//!
//! An AU/VST3/CLAP delay built with [nih-plug](https://github.com/robbert-vdh/nih-plug).
//! A *driver* delay produces the echoes you hear; its feedback loop is
//! routed through a second *propagator* delay before coming back in, so
//! every repeat is itself delayed again on its way round.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──► driver.main_in ──┬─────────── × clean ──────────────┐
//!                            │                                  │
//!                            ▼                                  │
//!                    [Driver delay] ── delayed ── × effect ───►(+)──► Output
//!                        ▲       │
//!           × feedback   │       │ aux send
//!                        │       ▼
//!                  aux receive  [Propagator delay]
//!                        ▲       │   (length = driver × ratio)
//!                        └───────┘
//! ```
//!
//! ## Controls
//!
//! - **Feedback** sets the driver's feedback coefficient.
//! - **Length** sets the driver delay, 100 ms to 3 s.
//! - **Ratio** sets the propagator length from 1/4 to 4 times the driver.
//! - **Tap** sets the driver delay from the time between two presses.
//! - **Bypass** passes the dry signal while the delays keep ringing.
//!
//! ## Where Things Live
//!
//! The control layer never touches plugin parameters or audio buffers:
//! [`ratio`] maps the ratio knob, [`controller`] derives both delay lines'
//! parameters, [`routing`] declares the topology, and [`event_loop`] ties
//! them together once per block. It talks to the outside world only
//! through the [`engine`] traits, and borrows nih-plug for nothing but its
//! logging macros at setup. [`host`] provides the engine and control
//! surface the plugin runs them on.

pub mod config;
pub mod control;
pub mod controller;
pub mod delay;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod event_loop;
pub mod host;
pub mod params;
pub mod ratio;
pub mod routing;
pub mod tap;

use std::num::NonZeroU32;
use std::sync::Arc;

use config::PropagationConfig;
use event_loop::ControlLoop;
use host::{HostControls, HostEngine};
use nih_plug::prelude::*;
use params::PropagationParams;

/// Everything that only exists once the host has told us the sample rate.
struct Runtime {
    engine: HostEngine,
    controls: HostControls,
    control_loop: ControlLoop,
    /// Samples processed since initialization; the tap tempo clock.
    elapsed_samples: u64,
}

/// The plugin.
///
/// Parameters are shared with the host through an `Arc`. The runtime is
/// owned by the audio thread and only touched in `initialize()`,
/// `reset()` and `process()`.
struct PropagationDelay {
    params: Arc<PropagationParams>,
    config: PropagationConfig,
    sample_rate: f32,
    runtime: Option<Runtime>,
}

impl Default for PropagationDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(PropagationParams::default()),
            config: PropagationConfig::default(),
            // Placeholder until initialize().
            sample_rate: 44100.0,
            runtime: None,
        }
    }
}

impl Plugin for PropagationDelay {
    const NAME: &'static str = "Propagation Delay";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Mono only: one driver and one propagator.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(1),
        main_output_channels: NonZeroU32::new(1),
        aux_input_ports: &[],
        aux_output_ports: &[],
        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // The control loop runs once per block, so block boundaries are where
    // parameter changes land anyway.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Allocate both delay buffers and bring the control layer up.
    ///
    /// Returning `false` tells the host the plugin cannot run, which is
    /// what happens if the configuration or routing fails validation.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;

        let mut engine = HostEngine::new(&self.config, self.sample_rate);
        let control_loop = match event_loop::setup(&self.config, &mut engine) {
            Ok(control_loop) => control_loop,
            Err(err) => {
                nih_error!("propagation delay failed to start: {err}");
                return false;
            }
        };

        self.runtime = Some(Runtime {
            engine,
            controls: HostControls::new(&self.params, &self.config),
            control_loop,
            elapsed_samples: 0,
        });
        true
    }

    /// Playback stopped: silence the lines and drop any half-finished tap.
    fn reset(&mut self) {
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.engine.clear();
            runtime.controls.reset_tap();
        }
    }

    /// One control cycle, then one block of audio.
    ///
    /// The cycle writes both delay lines' parameters and hands them to the
    /// engine before any sample of the block is processed, so the whole
    /// block runs on one consistent driver/propagator pair.
    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let Some(runtime) = self.runtime.as_mut() else {
            return ProcessStatus::Normal;
        };

        let now_ms = runtime.elapsed_samples as f64 * 1000.0 / self.sample_rate as f64;
        let controls = runtime.controls.poll(&self.params, now_ms);
        runtime.control_loop.cycle(controls, &mut runtime.engine);
        runtime.engine.set_bypassed(self.params.bypass.value());

        for mut channel_samples in buffer.iter_samples() {
            for sample in channel_samples.iter_mut() {
                *sample = runtime.engine.process_sample(*sample);
            }
        }
        runtime.elapsed_samples += buffer.samples() as u64;

        ProcessStatus::Tail(runtime.engine.tail_samples())
    }
}

impl ClapPlugin for PropagationDelay {
    const CLAP_ID: &'static str = "com.loveless-audio.propagation-delay";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A delay whose feedback loop runs through a second delay");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for PropagationDelay {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssPropDly_v01";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Fx,
        Vst3SubCategory::Delay,
        Vst3SubCategory::Mono,
    ];
}

nih_export_clap!(PropagationDelay);
nih_export_vst3!(PropagationDelay);

// AUv2 entry point for Logic Pro.
clap_wrapper::export_auv2!();
