//! Sliding-window FFT bin-energy estimator shared by every detector's
//! spectral front end.

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Buffers incoming complex samples into non-overlapping frames of
/// `fft_size` and, on each completed frame, returns the energy in the few
/// bins surrounding the target frequency.
pub struct BinEnergyEstimator {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
    target_bin: usize,
    bin_span: usize,
    window: Vec<f64>,
    frame: Vec<Complex64>,
    fill: usize,
    scratch: Vec<Complex64>,
}

impl BinEnergyEstimator {
    /// `sample_rate_hz` and `target_hz` determine which FFT bin (and its
    /// immediate neighbors, `bin_span` on each side) the estimator sums
    /// energy over.
    pub fn new(fft_size: usize, sample_rate_hz: f64, target_hz: f64, bin_span: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let bin_hz = sample_rate_hz / fft_size as f64;
        let target_bin = (target_hz / bin_hz).round() as usize % fft_size;

        let window: Vec<f64> = (0..fft_size)
            .map(|n| {
                0.54 - 0.46 * (2.0 * std::f64::consts::PI * n as f64 / (fft_size - 1) as f64).cos()
            })
            .collect();

        Self {
            fft,
            fft_size,
            target_bin,
            bin_span,
            window,
            frame: vec![Complex64::new(0.0, 0.0); fft_size],
            fill: 0,
            scratch: vec![Complex64::new(0.0, 0.0); fft_size],
        }
    }

    /// Frame period in samples (== FFT size; frames do not overlap).
    pub fn frame_period_samples(&self) -> usize {
        self.fft_size
    }

    /// Push one complex sample. Returns `Some(energy)` whenever a frame
    /// completes.
    pub fn push(&mut self, i: f64, q: f64) -> Option<f64> {
        self.frame[self.fill] = Complex64::new(i, q) * self.window[self.fill];
        self.fill += 1;
        if self.fill < self.fft_size {
            return None;
        }
        self.fill = 0;

        self.scratch.copy_from_slice(&self.frame);
        self.fft.process(&mut self.scratch);

        let lo = self.target_bin.saturating_sub(self.bin_span);
        let hi = (self.target_bin + self.bin_span).min(self.fft_size - 1);
        let energy: f64 = (lo..=hi).map(|b| self.scratch[b].norm_sqr()).sum();
        Some(energy)
    }

    pub fn reset(&mut self) {
        self.fill = 0;
        self.frame.iter_mut().for_each(|c| *c = Complex64::new(0.0, 0.0));
    }
}
