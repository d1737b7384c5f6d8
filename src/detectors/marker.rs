//! Minute/hour marker detector: 800 ms bursts at second 0 of each minute.
//!
//! At ordinary minutes the marker uses the station's tick tone; at the
//! top of the hour (minute 0) it switches to 1500 Hz. Both variants are
//! tracked in parallel so either can trigger a confirmed marker.

use super::{pulse_timestamps_ms, PulseDetector, PulseStateMachine, PulseTuning};
use crate::config::{DetectorConfig, Station};
use crate::event::{DetectorEvent, EventPayload};
use crate::primitives::{BinEnergyEstimator, DcBlocker, SlidingPowerRing};
use crate::sample::Sample;

const HOUR_MARKER_HZ: f64 = 1500.0;

pub struct MarkerDetector {
    minute_estimator: BinEnergyEstimator,
    hour_estimator: BinEnergyEstimator,
    dc_i: DcBlocker,
    dc_q: DcBlocker,
    /// ~1 s smoothing window distinguishing an 800 ms marker from a run
    /// of ordinary ticks.
    smoothing: SlidingPowerRing,
    psm: PulseStateMachine,
    station: Station,
    sample_rate_hz: f64,
    frame_period_ms: f64,
    group_delay_ms: f64,
    enabled: bool,
    event_count: u64,
    last_energy: f64,
    last_tone_was_hour: bool,
}

impl MarkerDetector {
    pub fn new(station: Station) -> Self {
        Self::with_config(station, DetectorConfig::marker(), 50_000.0)
    }

    pub fn with_config(station: Station, cfg: DetectorConfig, sample_rate_hz: f64) -> Self {
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
        let smoothing_frames = (1_000.0 / frame_period_ms).ceil().max(1.0) as usize;
        Self {
            minute_estimator: BinEnergyEstimator::new(
                cfg.fft_size,
                sample_rate_hz,
                station.minute_marker_hz(),
                1,
            ),
            hour_estimator: BinEnergyEstimator::new(cfg.fft_size, sample_rate_hz, HOUR_MARKER_HZ, 1),
            dc_i: DcBlocker::new(0.999),
            dc_q: DcBlocker::new(0.999),
            smoothing: SlidingPowerRing::new(smoothing_frames),
            psm: PulseStateMachine::new(tuning),
            station,
            sample_rate_hz,
            frame_period_ms,
            group_delay_ms: cfg.fft_size as f64 / 2.0 / sample_rate_hz * 1_000.0,
            enabled: true,
            event_count: 0,
            last_energy: 0.0,
            last_tone_was_hour: false,
        }
    }

    /// Retune the adaptive threshold multiplier between frames, per the
    /// control plane's `SET_MARKER_THRESHOLD` command.
    pub fn set_threshold_multiplier(&mut self, value: f64) {
        let mut tuning = self.psm.tuning();
        tuning.threshold_multiplier = value;
        self.psm.set_tuning(tuning);
    }

    pub fn tuning(&self) -> PulseTuning {
        self.psm.tuning()
    }
}

impl PulseDetector for MarkerDetector {
    fn process_sample(&mut self, sample: Sample) -> Option<DetectorEvent> {
        let i = self.dc_i.process(sample.re as f64);
        let q = self.dc_q.process(sample.im as f64);

        let minute_energy = self.minute_estimator.push(i, q);
        let hour_energy = self.hour_estimator.push(i, q)?;
        let minute_energy = minute_energy?;

        let (combined, is_hour) = if hour_energy >= minute_energy {
            (hour_energy, true)
        } else {
            (minute_energy, false)
        };
        self.smoothing.push(combined);
        let smoothed = self.smoothing.mean();
        self.last_energy = smoothed;
        self.last_tone_was_hour = is_hour;

        let confirmed = self.psm.step(smoothed)?;
        if !self.enabled {
            return None;
        }

        let (leading_ms, trailing_ms, duration_ms) =
            pulse_timestamps_ms(&confirmed, self.frame_period_ms, self.group_delay_ms);

        self.event_count += 1;
        Some(DetectorEvent {
            leading_ms,
            trailing_ms,
            duration_ms,
            peak_energy: confirmed.peak_energy,
            baseline: confirmed.baseline,
            threshold: confirmed.threshold,
            payload: EventPayload::Marker {
                tone_hz: if self.last_tone_was_hour {
                    HOUR_MARKER_HZ
                } else {
                    self.station.minute_marker_hz()
                },
            },
        })
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn reset(&mut self) {
        self.psm.reset();
        self.minute_estimator.reset();
        self.hour_estimator.reset();
        self.dc_i.reset();
        self.dc_q.reset();
        self.smoothing.clear();
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

    fn drive_tone(det: &mut MarkerDetector, ms: f64, hz: f64) -> Vec<DetectorEvent> {
        let n = (ms / 1000.0 * det.sample_rate_hz) as usize;
        let mut events = Vec::new();
        for k in 0..n {
            let t = k as f64 / det.sample_rate_hz;
            let x = (2.0 * PI * hz * t).sin() as f32;
            if let Some(e) = det.process_sample(Sample::new(x, 0.0)) {
                events.push(e);
            }
        }
        events
    }

    fn drive_silence(det: &mut MarkerDetector, ms: f64) {
        let n = (ms / 1000.0 * det.sample_rate_hz) as usize;
        for _ in 0..n {
            det.process_sample(Sample::new(0.0, 0.0));
        }
    }

    #[test]
    fn no_marker_before_warmup_elapses() {
        let mut det = MarkerDetector::new(Station::Wwv);
        drive_silence(&mut det, 2_000.0);
        let events = drive_tone(&mut det, 800.0, 1000.0);
        assert!(events.is_empty());
    }

    #[test]
    fn confirms_marker_after_warmup() {
        let mut det = MarkerDetector::new(Station::Wwv);
        drive_silence(&mut det, 10_500.0);
        let mut events = drive_tone(&mut det, 800.0, 1000.0);
        events.extend(drive_silence_collect(&mut det, 500.0));
        assert_eq!(events.len(), 1);
        assert!(events[0].duration_ms >= 700.0 && events[0].duration_ms <= 900.0);
    }

    fn drive_silence_collect(det: &mut MarkerDetector, ms: f64) -> Vec<DetectorEvent> {
        let n = (ms / 1000.0 * det.sample_rate_hz) as usize;
        let mut events = Vec::new();
        for _ in 0..n {
            if let Some(e) = det.process_sample(Sample::new(0.0, 0.0)) {
                events.push(e);
            }
        }
        events
    }
}
