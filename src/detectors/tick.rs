//! Second-tick detector: 5 ms bursts at 1000 Hz (WWV) or 1200 Hz (WWVH).

use super::{pulse_timestamps_ms, PulseDetector, PulseState, PulseStateMachine, PulseTuning};
use crate::config::{DetectorConfig, Station};
use crate::event::{DetectorEvent, EventPayload};
use crate::primitives::{BinEnergyEstimator, DcBlocker};
use crate::sample::Sample;

/// ACTIVE duration at or beyond which a tick is also flagged `long_pulse`,
/// a cross-check consumed by the marker correlator's audit counter. Never
/// itself a marker declaration. Reported on its own path, independent of
/// the short-tick `[min_pulse_frames, max_pulse_frames]` bounds that gate
/// a confirmed tick: a pulse this long always fails those bounds, so
/// waiting for `PulseStateMachine::step` to confirm it would mean the
/// event never fires.
const LONG_PULSE_MS: f64 = 600.0;

pub struct TickDetector {
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
    long_pulse_reported: bool,
}

impl TickDetector {
    pub fn new(station: Station) -> Self {
        Self::with_config(station, DetectorConfig::tick(), 50_000.0)
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
        Self {
            estimator: BinEnergyEstimator::new(cfg.fft_size, sample_rate_hz, station.tick_hz(), 1),
            dc_i: DcBlocker::new(0.999),
            dc_q: DcBlocker::new(0.999),
            psm: PulseStateMachine::new(tuning),
            sample_rate_hz,
            frame_period_ms,
            group_delay_ms: cfg.fft_size as f64 / 2.0 / sample_rate_hz * 1_000.0,
            enabled: true,
            event_count: 0,
            last_energy: 0.0,
            long_pulse_reported: false,
        }
    }

    /// Retune the adaptive threshold multiplier between frames, per the
    /// control plane's `SET_TICK_THRESHOLD` command.
    pub fn set_threshold_multiplier(&mut self, value: f64) {
        let mut tuning = self.psm.tuning();
        tuning.threshold_multiplier = value;
        self.psm.set_tuning(tuning);
    }

    /// `SET_TICK_ADAPT_DOWN`.
    pub fn set_alpha_down(&mut self, value: f64) {
        let mut tuning = self.psm.tuning();
        tuning.alpha_down = value;
        self.psm.set_tuning(tuning);
    }

    /// `SET_TICK_ADAPT_UP`.
    pub fn set_alpha_up(&mut self, value: f64) {
        let mut tuning = self.psm.tuning();
        tuning.alpha_up = value;
        self.psm.set_tuning(tuning);
    }

    /// `SET_MIN_PULSE_MS`.
    pub fn set_min_pulse_ms(&mut self, ms: f64) {
        let mut tuning = self.psm.tuning();
        tuning.min_pulse_frames = (ms / self.frame_period_ms).ceil().max(1.0) as u64;
        self.psm.set_tuning(tuning);
    }

    /// `SET_MAX_PULSE_MS`.
    pub fn set_max_pulse_ms(&mut self, ms: f64) {
        let mut tuning = self.psm.tuning();
        tuning.max_pulse_frames = (ms / self.frame_period_ms).ceil().max(1.0) as u64;
        self.psm.set_tuning(tuning);
    }

    /// Current pulse-state-machine tuning, surfaced for tests and
    /// diagnostics that want to confirm a control command took effect.
    pub fn tuning(&self) -> PulseTuning {
        self.psm.tuning()
    }
}

impl PulseDetector for TickDetector {
    fn process_sample(&mut self, sample: Sample) -> Option<DetectorEvent> {
        let i = self.dc_i.process(sample.re as f64);
        let q = self.dc_q.process(sample.im as f64);
        let energy = self.estimator.push(i, q)?;
        self.last_energy = energy;

        let confirmed = self.psm.step(energy);

        // Long-pulse cross-check: reported once per in-progress pulse, the
        // moment ACTIVE crosses the threshold, since a pulse this long
        // always falls outside the short-tick duration bounds `confirmed`
        // is gated by and so would never reach a trailing edge here.
        if matches!(self.psm.state(), PulseState::Active | PulseState::Falling) {
            let active_ms = self.psm.active_duration_frames() as f64 * self.frame_period_ms;
            if active_ms >= LONG_PULSE_MS && !self.long_pulse_reported {
                self.long_pulse_reported = true;
                if !self.enabled {
                    return None;
                }
                let trailing_ms = self.psm.frame_index() as f64 * self.frame_period_ms;
                self.event_count += 1;
                return Some(DetectorEvent {
                    leading_ms: trailing_ms - active_ms - self.group_delay_ms,
                    trailing_ms,
                    duration_ms: active_ms,
                    peak_energy: self.last_energy,
                    baseline: self.psm.baseline(),
                    threshold: self.psm.threshold(),
                    payload: EventPayload::Tick { long_pulse: true },
                });
            }
        } else {
            self.long_pulse_reported = false;
        }

        let confirmed = confirmed?;
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
            payload: EventPayload::Tick { long_pulse: false },
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
        self.estimator.reset();
        self.dc_i.reset();
        self.dc_q.reset();
        self.long_pulse_reported = false;
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
