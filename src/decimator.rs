//! Multi-stage decimation cascade: 2 Msps -> 50 kHz (detector path) and
//! a further stage to 12 kHz (display path).
//!
//! Stage 1 decimates by 8 (cutoff ~100 kHz), stage 2 decimates by 5
//! (cutoff ~20 kHz) to reach the 50 kHz detector rate; stage 3 is a
//! 48/50 polyphase rational resampler from the detector rate down to the
//! 12 kHz display rate. I and Q are filtered with identical real-valued
//! taps at every stage, so the cascade never introduces I/Q skew.

use crate::errors::{Result, WwvError};
use crate::sample::Sample;
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Windowed-sinc low-pass FIR design (Hamming window), symmetric, unity DC
/// gain. `cutoff` is normalized to the input Nyquist (0, 1).
fn design_lowpass_fir(num_taps: usize, cutoff: f64) -> Vec<f64> {
    assert!(num_taps % 2 == 1, "FIR order must be odd for linear phase");
    let m = (num_taps - 1) as f64;
    let mut taps: Vec<f64> = (0..num_taps)
        .map(|n| {
            let x = n as f64 - m / 2.0;
            let sinc = if x.abs() < 1e-12 {
                cutoff
            } else {
                (PI * cutoff * x).sin() / (PI * x)
            };
            let window = 0.54 - 0.46 * (2.0 * PI * n as f64 / m).cos();
            sinc * window
        })
        .collect();
    let dc_gain: f64 = taps.iter().sum();
    taps.iter_mut().for_each(|t| *t /= dc_gain);
    taps
}

/// A single FIR decimation stage: filters then keeps every `factor`-th
/// output sample. Maintains its own input history so filtering is
/// continuous across calls.
struct FirDecimatorStage {
    taps: Vec<f64>,
    factor: usize,
    history: VecDeque<Sample>,
    /// Position within the decimation phase, carried across calls.
    phase: usize,
}

impl FirDecimatorStage {
    fn new(taps: Vec<f64>, factor: usize) -> Self {
        let len = taps.len();
        Self {
            taps,
            factor,
            history: VecDeque::from(vec![Sample::new(0.0, 0.0); len]),
            phase: 0,
        }
    }

    fn group_delay_samples(&self) -> f64 {
        (self.taps.len() as f64 - 1.0) / 2.0
    }

    /// Upper bound on how many output samples a call to [`Self::process`]
    /// can produce for `input_len` input samples.
    fn max_output_len(&self, input_len: usize) -> usize {
        input_len / self.factor + 1
    }

    /// Filter and decimate `input`, appending kept output samples to `out`.
    /// `out` must have enough spare capacity or `BufferFull` is returned
    /// without consuming any part of `input`.
    fn process(&mut self, input: &[Sample], out: &mut Vec<Sample>) -> Result<()> {
        let max_out = input.len() / self.factor + 1;
        if out.capacity() - out.len() < max_out {
            return Err(WwvError::BufferFull {
                capacity: out.capacity(),
                attempted: out.len() + max_out,
            });
        }

        for &sample in input {
            self.history.push_back(sample);
            self.history.pop_front();

            if self.phase == 0 {
                let mut acc = Sample::new(0.0, 0.0);
                for (tap, hist) in self.taps.iter().zip(self.history.iter()) {
                    acc += hist * (*tap as f32);
                }
                out.push(acc);
            }
            self.phase = (self.phase + 1) % self.factor;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.history.iter_mut().for_each(|s| *s = Sample::new(0.0, 0.0));
        self.phase = 0;
    }
}

/// Rational resampler implementing the 48/50 stage: interpolate by 48,
/// decimate by 50, realized as a single polyphase filter bank so no
/// intermediate upsampled buffer is ever materialized.
struct PolyphaseResampler {
    /// One filter phase per interpolation step (48 phases).
    phases: Vec<Vec<f64>>,
    history: VecDeque<Sample>,
    interp: usize,
    decim: usize,
    /// Position in the combined up/down sample counter.
    counter: usize,
}

impl PolyphaseResampler {
    fn new(interp: usize, decim: usize, taps_per_phase: usize) -> Self {
        let total_taps = interp * taps_per_phase;
        let prototype = design_lowpass_fir(total_taps | 1, 1.0 / interp.max(decim) as f64);
        let mut phases = vec![Vec::with_capacity(taps_per_phase + 1); interp];
        for (i, &t) in prototype.iter().enumerate() {
            phases[i % interp].push(t * interp as f64);
        }
        let hist_len = phases.iter().map(|p| p.len()).max().unwrap_or(1);
        Self {
            phases,
            history: VecDeque::from(vec![Sample::new(0.0, 0.0); hist_len]),
            interp,
            decim,
            counter: 0,
        }
    }

    fn max_output_len(&self, input_len: usize) -> usize {
        input_len * self.interp / self.decim + 1
    }

    fn process(&mut self, input: &[Sample], out: &mut Vec<Sample>) -> Result<()> {
        let max_out = self.max_output_len(input.len());
        if out.capacity() - out.len() < max_out {
            return Err(WwvError::BufferFull {
                capacity: out.capacity(),
                attempted: out.len() + max_out,
            });
        }

        for &sample in input {
            self.history.push_back(sample);
            self.history.pop_front();

            // Every input sample advances the counter by `interp`; whenever
            // it crosses a multiple of `decim` an output phase fires.
            for _ in 0..self.interp {
                if self.counter % self.decim == 0 {
                    let phase = &self.phases[self.counter % self.interp];
                    let mut acc = Sample::new(0.0, 0.0);
                    for (tap, hist) in phase.iter().zip(self.history.iter()) {
                        acc += hist * (*tap as f32);
                    }
                    out.push(acc);
                }
                self.counter += 1;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.history.iter_mut().for_each(|s| *s = Sample::new(0.0, 0.0));
        self.counter = 0;
    }
}

/// The full 2 Msps -> 50 kHz / 12 kHz decimation cascade.
pub struct Decimator {
    stage1: FirDecimatorStage,
    stage2: FirDecimatorStage,
    display_stage: PolyphaseResampler,
    detector_scratch: Vec<Sample>,
    stage1_scratch: Vec<Sample>,
}

impl Decimator {
    pub fn new() -> Self {
        let stage1_taps = design_lowpass_fir(63, 100_000.0 / (2_000_000.0 / 2.0));
        let stage2_taps = design_lowpass_fir(63, 20_000.0 / (250_000.0 / 2.0));
        Self {
            stage1: FirDecimatorStage::new(stage1_taps, 8),
            stage2: FirDecimatorStage::new(stage2_taps, 5),
            display_stage: PolyphaseResampler::new(48, 50, 8),
            detector_scratch: Vec::with_capacity(1 << 16),
            stage1_scratch: Vec::with_capacity(1 << 16),
        }
    }

    /// Group delay of the full detector-path cascade, in detector-rate
    /// samples, for leading-edge correction downstream.
    pub fn detector_path_group_delay_samples(&self) -> f64 {
        self.stage1.group_delay_samples() / 5.0 + self.stage2.group_delay_samples()
    }

    /// Run one chunk of 2 Msps input through the cascade, producing the
    /// 50 kHz detector-rate samples and the 12 kHz display-rate samples
    /// derived from the same input sample index (no drift between paths).
    pub fn process_chunk(
        &mut self,
        input: &[Sample],
        detector_out: &mut Vec<Sample>,
        display_out: &mut Vec<Sample>,
    ) -> Result<()> {
        self.stage1_scratch.clear();
        self.stage1_scratch.reserve(self.stage1.max_output_len(input.len()));
        self.stage1.process(input, &mut self.stage1_scratch)?;

        self.detector_scratch.clear();
        self.detector_scratch
            .reserve(self.stage2.max_output_len(self.stage1_scratch.len()));
        self.stage2
            .process(&self.stage1_scratch, &mut self.detector_scratch)?;

        detector_out.extend_from_slice(&self.detector_scratch);
        self.display_stage.process(&self.detector_scratch, display_out)?;
        Ok(())
    }

    /// Reset all cascade state. Called on an upstream discontinuity.
    pub fn reset(&mut self) {
        self.stage1.reset();
        self.stage2.reset();
        self.display_stage.reset();
    }
}

impl Default for Decimator {
    fn default() -> Self {
        Self::new()
    }
}
