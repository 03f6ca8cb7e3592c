//! # DSP Primitives
//!
//! The sample-level pieces the host engine is built from:
//!
//! - **`delay_line`**: the ring buffer each delay line reads and writes.
//! - **`smoother`**: a one-pole glide on the read position, so length
//!   changes sweep instead of click.

pub mod delay_line;
pub mod smoother;
