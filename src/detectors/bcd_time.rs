//! Time-domain BCD detector: envelope of a narrow 100 Hz bandpass,
//! classified by pulse width into ZERO/ONE/POSITION_MARKER.

use super::{pulse_timestamps_ms, ConfirmedPulse, PulseDetector, PulseStateMachine, PulseTuning};
use crate::config::DetectorConfig;
use crate::event::{BcdSymbol, DetectorEvent, EventPayload};
use crate::primitives::Biquad;
use crate::sample::Sample;

const TARGET_HZ: f64 = 100.0;
const BANDPASS_Q: f64 = 8.0;

pub struct BcdTimeDetector {
    bandpass_i: Biquad,
    bandpass_q: Biquad,
    psm: PulseStateMachine,
    frame_size: usize,
    frame_accum: f64,
    frame_fill: usize,
    sample_rate_hz: f64,
    frame_period_ms: f64,
    group_delay_ms: f64,
    enabled: bool,
    event_count: u64,
    last_energy: f64,
    /// Second-of-minute counter for the symbol about to complete. The
    /// sync subsystem corrects this via [`Self::set_second_in_minute`]
    /// whenever epoch lock establishes or corrects phase.
    second_in_minute: u8,
}

impl BcdTimeDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::bcd(), 50_000.0)
    }

    pub fn with_config(cfg: DetectorConfig, sample_rate_hz: f64) -> Self {
        let frame_size = (sample_rate_hz * 0.01) as usize; // ~10 ms frame period
        let frame_period_ms = frame_size as f64 / sample_rate_hz * 1_000.0;
        let tuning = PulseTuning {
            threshold_multiplier: cfg.threshold_multiplier,
            alpha_up: cfg.alpha_up,
            alpha_down: cfg.alpha_down,
            min_pulse_frames: (cfg.min_pulse_ms / frame_period_ms).ceil().max(1.0) as u64,
            max_pulse_frames: (cfg.max_pulse_ms / frame_period_ms).ceil().max(1.0) as u64,
            cooldown_frames: (cfg.cooldown_ms / frame_period_ms).ceil().max(1.0) as u64,
            warmup_frames: (cfg.warmup_ms / frame_period_ms).ceil().max(1.0) as u64,
        };
        let bandpass_i = Biquad::bandpass(sample_rate_hz, TARGET_HZ, BANDPASS_Q);
        Self {
            group_delay_ms: bandpass_i.group_delay_samples() / sample_rate_hz * 1_000.0,
            bandpass_i,
            bandpass_q: Biquad::bandpass(sample_rate_hz, TARGET_HZ, BANDPASS_Q),
            psm: PulseStateMachine::new(tuning),
            frame_size,
            frame_accum: 0.0,
            frame_fill: 0,
            sample_rate_hz,
            frame_period_ms,
            enabled: true,
            event_count: 0,
            last_energy: 0.0,
            second_in_minute: 0,
        }
    }

    /// Externally correct the second-of-minute counter (called by the sync
    /// subsystem on epoch (re)lock).
    pub fn set_second_in_minute(&mut self, second: u8) {
        self.second_in_minute = second % 60;
    }

    fn advance_second(&mut self) {
        self.second_in_minute = (self.second_in_minute + 1) % 60;
    }

    /// Retune the adaptive threshold multiplier between frames, per the
    /// control plane's `SET_BCD_THRESHOLD` command.
    pub fn set_threshold_multiplier(&mut self, value: f64) {
        let mut tuning = self.psm.tuning();
        tuning.threshold_multiplier = value;
        self.psm.set_tuning(tuning);
    }

    pub fn tuning(&self) -> PulseTuning {
        self.psm.tuning()
    }

    fn emit(&mut self, confirmed: ConfirmedPulse) -> Option<DetectorEvent> {
        let (leading_ms, trailing_ms, duration_ms) =
            pulse_timestamps_ms(&confirmed, self.frame_period_ms, self.group_delay_ms);
        let symbol = BcdSymbol::classify(duration_ms)?;
        let second = self.second_in_minute;
        self.advance_second();
        self.event_count += 1;
        Some(DetectorEvent {
            leading_ms,
            trailing_ms,
            duration_ms,
            peak_energy: confirmed.peak_energy,
            baseline: confirmed.baseline,
            threshold: confirmed.threshold,
            payload: EventPayload::BcdSymbol {
                second_in_minute: second,
                symbol,
            },
        })
    }
}

impl Default for BcdTimeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseDetector for BcdTimeDetector {
    fn process_sample(&mut self, sample: Sample) -> Option<DetectorEvent> {
        let i = self.bandpass_i.process(sample.re as f64);
        let q = self.bandpass_q.process(sample.im as f64);
        self.frame_accum += (i * i + q * q).sqrt();
        self.frame_fill += 1;
        if self.frame_fill < self.frame_size {
            return None;
        }
        let envelope = self.frame_accum / self.frame_size as f64;
        self.frame_accum = 0.0;
        self.frame_fill = 0;
        self.last_energy = envelope;

        let confirmed = self.psm.step(envelope)?;
        if !self.enabled {
            return None;
        }
        self.emit(confirmed)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn reset(&mut self) {
        self.psm.reset();
        self.bandpass_i.reset();
        self.bandpass_q.reset();
        self.frame_accum = 0.0;
        self.frame_fill = 0;
        self.second_in_minute = 0;
    }

    fn baseline(&self) -> f64 {
        self.psm.baseline()
    }

    fn threshold(&self) -> f64 {
        self.psm.threshold()
    }

    fn current_energy(&self) -> f64 {
        self.last_energy
    }

    fn event_count(&self) -> u64 {
        self.event_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn drive(det: &mut BcdTimeDetector, ms: f64, hz: f64, amp: f32) -> Vec<DetectorEvent> {
        let n = (ms / 1000.0 * det.sample_rate_hz) as usize;
        let mut events = Vec::new();
        for k in 0..n {
            let t = k as f64 / det.sample_rate_hz;
            let x = amp * (2.0 * PI * hz * t).sin() as f32;
            if let Some(e) = det.process_sample(Sample::new(x, 0.0)) {
                events.push(e);
            }
        }
        events
    }

    #[test]
    fn silence_produces_no_symbols() {
        let mut det = BcdTimeDetector::new();
        let events = drive(&mut det, 3_000.0, 100.0, 0.0);
        assert!(events.is_empty());
    }

    #[test]
    fn second_counter_advances_per_confirmed_symbol() {
        let mut det = BcdTimeDetector::new();
        det.set_second_in_minute(5);
        drive(&mut det, 2_500.0, 100.0, 0.0); // warmup
        let events = drive(&mut det, 210.0, 100.0, 1.0);
        let mut tail = drive(&mut det, 300.0, 100.0, 0.0);
        let mut all = events;
        all.append(&mut tail);
        if let Some(e) = all.into_iter().next() {
            if let EventPayload::BcdSymbol { second_in_minute, .. } = e.payload {
                assert_eq!(second_in_minute, 5);
            }
        }
    }
}
