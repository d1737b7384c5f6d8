//! Frequency-domain BCD detector: a slow FFT tuned at 100 Hz, classified
//! by pulse width. Runs independently of [`super::bcd_time::BcdTimeDetector`];
//! disagreement between the two paths is a quality signal, not an error.

use super::{pulse_timestamps_ms, ConfirmedPulse, PulseDetector, PulseStateMachine, PulseTuning};
use crate::config::DetectorConfig;
use crate::event::{BcdSymbol, DetectorEvent, EventPayload};
use crate::primitives::{BinEnergyEstimator, DcBlocker};
use crate::sample::Sample;

const TARGET_HZ: f64 = 100.0;

pub struct BcdFreqDetector {
    estimator: BinEnergyEstimator,
    dc_i: DcBlocker,
    dc_q: DcBlocker,
    psm: PulseStateMachine,
    sample_rate_hz: f64,
    frame_period_ms: f64,
    group_delay_ms: f64,
    enabled: bool,
    event_count: u64,
    last_energy: f64,
    second_in_minute: u8,
}

impl BcdFreqDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::bcd(), 50_000.0)
    }

    pub fn with_config(cfg: DetectorConfig, sample_rate_hz: f64) -> Self {
        let frame_period_ms = cfg.fft_size as f64 / sample_rate_hz * 1_000.0;
        let tuning = PulseTuning {
            threshold_multiplier: cfg.threshold_multiplier,
            alpha_up: cfg.alpha_up,
            alpha_down: cfg.alpha_down,
            min_pulse_frames: (cfg.min_pulse_ms / frame_period_ms).ceil().max(1.0) as u64,
            max_pulse_frames: (cfg.max_pulse_ms / frame_period_ms).ceil().max(1.0) as u64,
            cooldown_frames: (cfg.cooldown_ms / frame_period_ms).ceil().max(1.0) as u64,
            warmup_frames: (cfg.warmup_ms / frame_period_ms).ceil().max(1.0) as u64,
        };
        Self {
            estimator: BinEnergyEstimator::new(cfg.fft_size, sample_rate_hz, TARGET_HZ, 2),
            dc_i: DcBlocker::new(0.999),
            dc_q: DcBlocker::new(0.999),
            psm: PulseStateMachine::new(tuning),
            sample_rate_hz,
            frame_period_ms,
            group_delay_ms: cfg.fft_size as f64 / 2.0 / sample_rate_hz * 1_000.0,
            enabled: true,
            event_count: 0,
            last_energy: 0.0,
            second_in_minute: 0,
        }
    }

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

impl Default for BcdFreqDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseDetector for BcdFreqDetector {
    fn process_sample(&mut self, sample: Sample) -> Option<DetectorEvent> {
        let i = self.dc_i.process(sample.re as f64);
        let q = self.dc_q.process(sample.im as f64);
        let energy = self.estimator.push(i, q)?;
        self.last_energy = energy;

        let confirmed = self.psm.step(energy)?;
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
        self.estimator.reset();
        self.dc_i.reset();
        self.dc_q.reset();
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

    #[test]
    fn silence_produces_no_symbols() {
        let mut det = BcdFreqDetector::new();
        for _ in 0..(det.sample_rate_hz as usize * 3) {
            assert!(det.process_sample(Sample::new(0.0, 0.0)).is_none());
        }
        assert_eq!(det.event_count(), 0);
    }
}
