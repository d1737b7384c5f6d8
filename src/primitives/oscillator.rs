//! Complex numerically-controlled oscillator for mixing/tuning

use num_complex::Complex64;
use std::f64::consts::{PI, TAU};

/// Maintains a running phase and produces `(cos, sin)` pairs, or mixes a
/// complex sample by `e^{jφ}` to retune a zero-IF stream.
#[derive(Debug, Clone, Copy)]
pub struct ComplexOscillator {
    phase: f64,
    phase_increment: f64,
}

impl ComplexOscillator {
    /// `freq_hz` may be negative to mix a tone down rather than up.
    pub fn new(freq_hz: f64, sample_rate_hz: f64) -> Self {
        Self {
            phase: 0.0,
            phase_increment: TAU * freq_hz / sample_rate_hz,
        }
    }

    fn wrap(phase: f64) -> f64 {
        let mut p = phase;
        while p > PI {
            p -= TAU;
        }
        while p < -PI {
            p += TAU;
        }
        p
    }

    /// Advance the oscillator by one sample, returning `(cos, sin)` of the
    /// new phase. Phase is wrapped to `[-pi, pi]` every sample.
    pub fn tick(&mut self) -> (f64, f64) {
        self.phase = Self::wrap(self.phase + self.phase_increment);
        (self.phase.cos(), self.phase.sin())
    }

    /// Mix `(i, q)` by the oscillator's current complex exponential and
    /// advance by one sample.
    pub fn mix(&mut self, i: f64, q: f64) -> (f64, f64) {
        let (c, s) = self.tick();
        let sample = Complex64::new(i, q) * Complex64::new(c, s);
        (sample.re, sample.im)
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    pub fn set_frequency(&mut self, freq_hz: f64, sample_rate_hz: f64) {
        self.phase_increment = TAU * freq_hz / sample_rate_hz;
    }
}
