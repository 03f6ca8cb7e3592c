//! Errors that can stop the effect from starting.
//!
//! Once running, nothing fails: every out-of-range value is clamped.

use thiserror::Error;

use crate::config::ConfigError;
use crate::routing::RoutingError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid routing: {0}")]
    Routing(#[from] RoutingError),
}
