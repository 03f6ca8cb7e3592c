//! # Delay Buffer (Ring Buffer)
//!
//! The sample storage behind one delay line. A write head records audio
//! into a circular buffer; a read head trails it by the delay length.
//!
//! ```text
//!        read (write_pos - delay)        write_pos
//!              │                            │
//! [ . . . . . .▼. . . . . . . . . . . . . . ▼ . . . ]  ← wraps around
//! ```
//!
//! Per sample: `read()`, then `write()`, then `advance()`. Reading before
//! writing is what lets a delay line feed its own output back in.
//!
//! Fractional delays are read with linear interpolation, so a smoothed
//! length sweeps the read head continuously instead of stepping between
//! whole samples.

use std::num::NonZeroUsize;

/// A pre-allocated ring buffer of `f32` samples.
///
/// The buffer is sized once, for the longest delay the line can ever
/// have. Changing the length later only moves the read head, so nothing
/// allocates on the audio thread.
pub struct DelayBuffer {
    buffer: Vec<f32>,
    write_pos: usize,
    buffer_len: usize,
}

impl DelayBuffer {
    /// Create a buffer holding `max_length` samples.
    pub fn new(max_length: NonZeroUsize) -> Self {
        let buffer_len = max_length.get();
        Self {
            buffer: vec![0.0; buffer_len],
            write_pos: 0,
            buffer_len,
        }
    }

    /// Create a buffer long enough for `max_ms` at `sample_rate`, plus a
    /// couple of samples for the interpolation neighbour.
    pub fn for_duration(max_ms: f32, sample_rate: f32) -> Self {
        let samples = ms_to_samples(max_ms, sample_rate).ceil().max(0.0) as usize + 2;
        Self::new(NonZeroUsize::new(samples).unwrap_or(NonZeroUsize::MIN))
    }

    /// Longest delay this buffer can read, in samples.
    pub fn max_delay_samples(&self) -> f32 {
        (self.buffer_len - 1) as f32
    }

    /// Store a sample at the write head. Does not advance.
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
    }

    /// Read `delay_samples` behind the write head, interpolating between
    /// the two nearest stored samples.
    ///
    /// The index math adds `buffer_len` before subtracting so the `usize`
    /// never goes negative:
    ///
    /// ```text
    /// read_index = (write_pos + buffer_len - delay) % buffer_len
    /// ```
    pub fn read(&self, delay_samples: f32) -> f32 {
        let delay = delay_samples.clamp(0.0, self.max_delay_samples());

        let delay_int = delay as usize;
        let delay_frac = delay - delay_int as f32;

        let newer = (self.write_pos + self.buffer_len - delay_int) % self.buffer_len;
        let older = (self.write_pos + self.buffer_len - delay_int - 1) % self.buffer_len;

        self.buffer[newer] * (1.0 - delay_frac) + self.buffer[older] * delay_frac
    }

    /// Move the write head forward one sample, wrapping at the end.
    pub fn advance(&mut self) {
        self.write_pos = (self.write_pos + 1) % self.buffer_len;
    }

    /// Silence the buffer and rewind the write head.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// `delay_samples = delay_ms * sample_rate / 1000`
pub const fn ms_to_samples(delay_ms: f32, sample_rate: f32) -> f32 {
    delay_ms * sample_rate / 1000.0
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
