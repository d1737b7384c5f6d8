//! The complex I/Q sample type shared across the whole pipeline.

use num_complex::Complex32;

/// A single normalized complex baseband sample, `I + jQ`, each component
/// in `[-1, 1]`. The path rate is not carried per-sample; it is an
/// attribute of which stage produced the stream.
pub type Sample = Complex32;

/// Convert a little-endian interleaved I/Q int16 pair to a normalized sample.
pub fn sample_from_i16(i: i16, q: i16) -> Sample {
    const SCALE: f32 = 1.0 / 32768.0;
    Sample::new(i as f32 * SCALE, q as f32 * SCALE)
}
