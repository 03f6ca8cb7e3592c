//! # Routing Topology
//!
//! Which audio port feeds which. The graph is declared once, before the
//! engine starts, and never changes; only parameter values move at runtime.
//!
//! ## Delay in the Delay
//!
//! ```text
//! host in ──► driver.main_in          driver.main_out ──► host out
//!                   │                        ▲
//!                   ▼                        │
//!             [driver delay] ── aux_send ──► propagator.main_in
//!                   ▲                              │
//!                   │                       [propagator delay]
//!                   │                              │
//!              aux_receive ◄──────── propagator.main_out
//! ```
//!
//! The driver's feedback signal leaves through its aux send, runs through
//! the propagator and comes back through the aux receive, where the driver
//! scales it by its own feedback coefficient.
//!
//! ## Evaluation Order
//!
//! Routes are evaluated in declaration order. A delay line's main output
//! mixes in its clean main input, so every route *into* a line's main input
//! must be declared before any route *out of* its main output.

use nih_plug::prelude::*;
use thiserror::Error;

use crate::engine::AudioEngine;

/// Every port a route can connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// Audio arriving from the host.
    HostInput,
    /// Audio handed back to the host.
    HostOutput,
    DriverMainInput,
    DriverMainOutput,
    /// The driver's delayed signal, sent out of its feedback loop.
    DriverAuxSend,
    /// Where the driver's feedback signal comes back in.
    DriverAuxReceive,
    PropagatorMainInput,
    PropagatorMainOutput,
}

impl Port {
    /// Number of ports, for port-indexed arrays.
    pub const COUNT: usize = 8;

    /// Position of this port in a port-indexed array.
    pub const fn index(self) -> usize {
        match self {
            Self::HostInput => 0,
            Self::HostOutput => 1,
            Self::DriverMainInput => 2,
            Self::DriverMainOutput => 3,
            Self::DriverAuxSend => 4,
            Self::DriverAuxReceive => 5,
            Self::PropagatorMainInput => 6,
            Self::PropagatorMainOutput => 7,
        }
    }

    /// Whether audio can be taken from this port.
    pub const fn is_source(self) -> bool {
        matches!(
            self,
            Self::HostInput
                | Self::DriverMainOutput
                | Self::DriverAuxSend
                | Self::PropagatorMainOutput
        )
    }

    /// Whether audio can be delivered to this port.
    pub const fn is_destination(self) -> bool {
        !self.is_source()
    }

    /// The input port whose signal this output also carries, if any.
    const fn feeds_from(self) -> Option<Port> {
        match self {
            Self::DriverMainOutput => Some(Self::DriverMainInput),
            Self::PropagatorMainOutput => Some(Self::PropagatorMainInput),
            _ => None,
        }
    }
}

/// One directed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub source: Port,
    pub destination: Port,
}

impl Route {
    pub const fn new(source: Port, destination: Port) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Why a list of routes was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("{0:?} cannot be used as a route source")]
    NotASource(Port),

    #[error("{0:?} cannot be used as a route destination")]
    NotADestination(Port),

    #[error("route {:?} -> {:?} is declared more than once", .0.source, .0.destination)]
    DuplicateRoute(Route),

    /// A line's output was read before everything feeding its input had
    /// been declared.
    #[error("{output:?} is routed before a route into {input:?}")]
    OutputBeforeInput {
        /// The output that was used too early.
        output: Port,
        /// The input that was still being fed afterwards.
        input: Port,
    },
}

/// The four routes that put the propagator inside the driver's feedback
/// loop.
const DELAY_IN_DELAY: [Route; 4] = [
    Route::new(Port::HostInput, Port::DriverMainInput),
    Route::new(Port::DriverMainOutput, Port::HostOutput),
    Route::new(Port::DriverAuxSend, Port::PropagatorMainInput),
    Route::new(Port::PropagatorMainOutput, Port::DriverAuxReceive),
];

/// A validated, ordered, immutable list of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingGraph {
    routes: Vec<Route>,
}

impl RoutingGraph {
    /// The delay-in-the-delay topology this effect is built around.
    pub fn delay_in_delay() -> Self {
        Self {
            routes: DELAY_IN_DELAY.to_vec(),
        }
    }

    /// Validate an ordered list of routes.
    pub fn from_routes(routes: &[Route]) -> Result<Self, RoutingError> {
        for (i, route) in routes.iter().enumerate() {
            if !route.source.is_source() {
                return Err(RoutingError::NotASource(route.source));
            }
            if !route.destination.is_destination() {
                return Err(RoutingError::NotADestination(route.destination));
            }
            if routes[..i].contains(route) {
                return Err(RoutingError::DuplicateRoute(*route));
            }
            if let Some(input) = route.source.feeds_from() {
                if routes[i + 1..].iter().any(|later| later.destination == input) {
                    return Err(RoutingError::OutputBeforeInput {
                        output: route.source,
                        input,
                    });
                }
            }
        }

        Ok(Self {
            routes: routes.to_vec(),
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Announce every route to the engine, in order. Call once, before
    /// [`AudioEngine::run`].
    pub fn declare<E: AudioEngine>(&self, engine: &mut E) {
        for route in &self.routes {
            nih_log!("routing {:?} -> {:?}", route.source, route.destination);
            engine.route_audio(route.source, route.destination);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
