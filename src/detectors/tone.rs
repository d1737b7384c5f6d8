//! Carrier/background tone tracker.
//!
//! Tracks a single nominal frequency (carrier, or one of the 440/500/600/
//! 1000/1200/1500 Hz background tones) with a narrowband filter, then
//! reports measured frequency, offset, and SNR roughly once per second.
//! These reports feed observability only; they never drive the sync loop.

use crate::config::DetectorConfig;
use crate::event::{DetectorEvent, EventPayload};
use crate::primitives::DcBlocker;
use crate::sample::Sample;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub struct ToneTracker {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
    sample_rate_hz: f64,
    nominal_hz: f64,
    dc_i: DcBlocker,
    dc_q: DcBlocker,
    frame: Vec<Complex64>,
    scratch: Vec<Complex64>,
    fill: usize,
    enabled: bool,
    report_count: u64,
}

impl ToneTracker {
    pub fn new(nominal_hz: f64) -> Self {
        Self::with_config(nominal_hz, DetectorConfig::tone(), 50_000.0)
    }

    pub fn with_config(nominal_hz: f64, cfg: DetectorConfig, sample_rate_hz: f64) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(cfg.fft_size);
        Self {
            fft,
            fft_size: cfg.fft_size,
            sample_rate_hz,
            nominal_hz,
            dc_i: DcBlocker::new(0.999),
            dc_q: DcBlocker::new(0.999),
            frame: vec![Complex64::new(0.0, 0.0); cfg.fft_size],
            scratch: vec![Complex64::new(0.0, 0.0); cfg.fft_size],
            fill: 0,
            enabled: true,
            report_count: 0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn report_count(&self) -> u64 {
        self.report_count
    }

    pub fn reset(&mut self) {
        self.fill = 0;
        self.dc_i.reset();
        self.dc_q.reset();
    }

    /// Push one sample; returns a tone report whenever a frame completes
    /// and the tracker is enabled.
    pub fn process_sample(&mut self, sample: Sample) -> Option<DetectorEvent> {
        let i = self.dc_i.process(sample.re as f64);
        let q = self.dc_q.process(sample.im as f64);
        self.frame[self.fill] = Complex64::new(i, q);
        self.fill += 1;
        if self.fill < self.fft_size {
            return None;
        }
        self.fill = 0;
        if !self.enabled {
            return None;
        }

        self.scratch.copy_from_slice(&self.frame);
        self.fft.process(&mut self.scratch);

        let bin_hz = self.sample_rate_hz / self.fft_size as f64;
        let target_bin = (self.nominal_hz / bin_hz).round() as usize % self.fft_size;

        let measured_hz = self.interpolated_peak_hz(target_bin, bin_hz);
        let signal_power = self.scratch[target_bin].norm_sqr();
        let floor_power = self.noise_floor_power(target_bin);
        let snr_db = 10.0 * (signal_power / floor_power.max(1e-18)).log10();

        self.report_count += 1;
        Some(DetectorEvent {
            leading_ms: 0.0,
            trailing_ms: 0.0,
            duration_ms: 0.0,
            peak_energy: signal_power,
            baseline: floor_power,
            threshold: 0.0,
            payload: EventPayload::Tone {
                measured_hz,
                offset_hz: measured_hz - self.nominal_hz,
                offset_ppm: (measured_hz - self.nominal_hz) / self.nominal_hz * 1.0e6,
                snr_db,
            },
        })
    }

    /// Parabolic (quadratic) interpolation across the peak bin and its
    /// two neighbors for a sub-bin-resolution frequency estimate.
    fn interpolated_peak_hz(&self, center_bin: usize, bin_hz: f64) -> f64 {
        if center_bin == 0 || center_bin + 1 >= self.fft_size {
            return center_bin as f64 * bin_hz;
        }
        let y0 = self.scratch[center_bin - 1].norm();
        let y1 = self.scratch[center_bin].norm();
        let y2 = self.scratch[center_bin + 1].norm();
        let denom = y0 - 2.0 * y1 + y2;
        let delta = if denom.abs() < 1e-12 {
            0.0
        } else {
            0.5 * (y0 - y2) / denom
        };
        (center_bin as f64 + delta) * bin_hz
    }

    /// Mean power over a band around, but excluding, the target bin.
    fn noise_floor_power(&self, target_bin: usize) -> f64 {
        let span = 8usize;
        let lo = target_bin.saturating_sub(span);
        let hi = (target_bin + span).min(self.fft_size - 1);
        let mut sum = 0.0;
        let mut n = 0usize;
        for b in lo..=hi {
            if b == target_bin {
                continue;
            }
            sum += self.scratch[b].norm_sqr();
            n += 1;
        }
        if n == 0 {
            1e-18
        } else {
            sum / n as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn tone_at_nominal_frequency_reports_near_zero_offset() {
        let mut tracker = ToneTracker::new(1000.0);
        let fs = 50_000.0;
        let mut last = None;
        for n in 0..8192 {
            let t = n as f64 / fs;
            let x = (2.0 * PI * 1000.0 * t).sin() as f32;
            if let Some(e) = tracker.process_sample(Sample::new(x, 0.0)) {
                last = Some(e);
            }
        }
        let e = last.expect("expected at least one report");
        if let EventPayload::Tone { offset_hz, snr_db, .. } = e.payload {
            assert!(offset_hz.abs() < 50.0);
            assert!(snr_db > 10.0);
        } else {
            panic!("expected Tone payload");
        }
    }

    #[test]
    fn disabled_tracker_produces_no_reports() {
        let mut tracker = ToneTracker::new(500.0);
        tracker.set_enabled(false);
        for _ in 0..8192 {
            assert!(tracker.process_sample(Sample::new(1.0, 0.0)).is_none());
        }
    }
}
