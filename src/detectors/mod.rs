//! Pulse detectors: convert a sample stream into discrete timestamped events.
//!
//! Every detector shares the same internal skeleton (spectral estimator ->
//! energy extraction -> adaptive baseline -> threshold -> pulse state
//! machine -> event emission) even though the specifics (FFT size, frame
//! period, target frequency) differ. [`PulseStateMachine`] factors out the
//! shared hysteresis/cooldown logic; each concrete detector owns its own
//! spectral front end and wraps the state machine.

pub mod bcd_freq;
pub mod bcd_time;
pub mod marker;
pub mod tick;
pub mod tone;

pub use bcd_freq::BcdFreqDetector;
pub use bcd_time::BcdTimeDetector;
pub use marker::MarkerDetector;
pub use tick::TickDetector;
pub use tone::ToneTracker;

use crate::event::DetectorEvent;
use crate::sample::Sample;

/// Common capability set every pulse detector exposes. Modeled as a trait
/// (open-world) rather than a tagged enum so tests can substitute fake
/// detectors without the correlators knowing the difference.
pub trait PulseDetector {
    /// Push one complex sample. Returns `Some(event)` at most once per
    /// call, on a confirmed trailing edge. Never blocks, never allocates.
    fn process_sample(&mut self, sample: Sample) -> Option<DetectorEvent>;

    /// Disable output without discarding internal adaptation state.
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Return to WARMUP, discarding pulse-state-machine state. Used on an
    /// upstream reset.
    fn reset(&mut self);

    fn baseline(&self) -> f64;

    fn threshold(&self) -> f64;

    fn current_energy(&self) -> f64;

    fn event_count(&self) -> u64;
}

/// Shared pulse lifecycle. States follow the WARMUP -> IDLE -> RISING ->
/// ACTIVE -> FALLING -> COOLDOWN -> IDLE cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    Warmup,
    Idle,
    Rising,
    Active,
    Falling,
    Cooldown,
}

/// A confirmed pulse, measured in frame indices at the owning detector's
/// frame rate. The detector converts these to milliseconds and applies
/// group-delay correction when building the public [`DetectorEvent`].
#[derive(Debug, Clone, Copy)]
pub struct ConfirmedPulse {
    pub leading_frame: u64,
    pub trailing_frame: u64,
    pub duration_frames: u64,
    pub peak_energy: f64,
    pub baseline: f64,
    pub threshold: f64,
}

/// Tuning shared by every pulse state machine instance. Detector-specific
/// values are read once per frame (not per sample), per the runtime-tuning
/// model: a control task may mutate these between frames.
#[derive(Debug, Clone, Copy)]
pub struct PulseTuning {
    pub threshold_multiplier: f64,
    pub alpha_up: f64,
    pub alpha_down: f64,
    pub min_pulse_frames: u64,
    pub max_pulse_frames: u64,
    pub cooldown_frames: u64,
    pub warmup_frames: u64,
}

/// Hysteresis + adaptive-baseline pulse detector, parameterized by frame
/// period rather than sample rate: callers feed it one energy value per
/// spectral-estimator frame.
#[derive(Debug, Clone)]
pub struct PulseStateMachine {
    tuning: PulseTuning,
    state: PulseState,
    baseline: f64,
    frame_index: u64,
    warmup_frames_seen: u64,
    rising_start_frame: u64,
    peak_energy: f64,
    cooldown_remaining: u64,
}

impl PulseStateMachine {
    pub fn new(tuning: PulseTuning) -> Self {
        Self {
            tuning,
            state: PulseState::Warmup,
            baseline: 0.0,
            frame_index: 0,
            warmup_frames_seen: 0,
            rising_start_frame: 0,
            peak_energy: 0.0,
            cooldown_remaining: 0,
        }
    }

    pub fn state(&self) -> PulseState {
        self.state
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn threshold(&self) -> f64 {
        self.baseline * self.tuning.threshold_multiplier
    }

    pub fn tuning(&self) -> PulseTuning {
        self.tuning
    }

    pub fn set_tuning(&mut self, tuning: PulseTuning) {
        self.tuning = tuning;
    }

    /// Current frame index, for detectors building a cross-check event off
    /// the in-progress pulse rather than a confirmed trailing edge.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn reset(&mut self) {
        self.state = PulseState::Warmup;
        self.baseline = 0.0;
        self.frame_index = 0;
        self.warmup_frames_seen = 0;
        self.peak_energy = 0.0;
        self.cooldown_remaining = 0;
    }

    /// Advance by one frame given the frame's extracted energy. Returns a
    /// confirmed pulse on a validated trailing edge; returns `None`
    /// otherwise, including when a pulse is rejected for falling outside
    /// `[min_pulse_frames, max_pulse_frames]`.
    pub fn step(&mut self, energy: f64) -> Option<ConfirmedPulse> {
        let frame = self.frame_index;
        self.frame_index += 1;

        if self.state == PulseState::Warmup {
            self.warmup_frames_seen += 1;
            self.update_baseline(energy);
            if self.warmup_frames_seen >= self.tuning.warmup_frames {
                self.state = PulseState::Idle;
            }
            return None;
        }

        let threshold = self.threshold();

        match self.state {
            PulseState::Idle => {
                self.update_baseline(energy);
                if energy >= threshold {
                    self.state = PulseState::Rising;
                    self.rising_start_frame = frame;
                    self.peak_energy = energy;
                }
                None
            }
            PulseState::Rising => {
                self.peak_energy = self.peak_energy.max(energy);
                if energy >= threshold {
                    self.state = PulseState::Active;
                } else {
                    // brief rise that didn't sustain; back to idle
                    self.state = PulseState::Idle;
                }
                None
            }
            PulseState::Active => {
                self.peak_energy = self.peak_energy.max(energy);
                // baseline frozen during an active pulse
                if energy < threshold {
                    self.state = PulseState::Falling;
                }
                None
            }
            PulseState::Falling => {
                if energy < threshold {
                    self.state = PulseState::Cooldown;
                    self.cooldown_remaining = self.tuning.cooldown_frames;

                    let duration_frames = frame.saturating_sub(self.rising_start_frame);
                    let confirmed = ConfirmedPulse {
                        leading_frame: self.rising_start_frame,
                        trailing_frame: frame,
                        duration_frames,
                        peak_energy: self.peak_energy,
                        baseline: self.baseline,
                        threshold,
                    };

                    return if duration_frames >= self.tuning.min_pulse_frames
                        && duration_frames <= self.tuning.max_pulse_frames
                    {
                        Some(confirmed)
                    } else {
                        None
                    };
                }
                self.peak_energy = self.peak_energy.max(energy);
                self.state = PulseState::Active;
                None
            }
            PulseState::Cooldown => {
                self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
                self.update_baseline(energy);
                if self.cooldown_remaining == 0 {
                    self.state = PulseState::Idle;
                }
                None
            }
            PulseState::Warmup => unreachable!("handled above"),
        }
    }

    /// Whether the pulse has remained ACTIVE for at least `frames` frames,
    /// counted from the rising edge. Used by the tick detector to flag a
    /// long-pulse cross-check without declaring a marker itself.
    pub fn active_duration_frames(&self) -> u64 {
        match self.state {
            PulseState::Active | PulseState::Falling => {
                self.frame_index.saturating_sub(self.rising_start_frame)
            }
            _ => 0,
        }
    }

    fn update_baseline(&mut self, energy: f64) {
        let alpha = if energy > self.baseline {
            self.tuning.alpha_up
        } else {
            self.tuning.alpha_down
        };
        self.baseline += alpha * (energy - self.baseline);
    }
}

/// Convert a confirmed pulse (measured in frame indices) to the
/// millisecond timestamps published on a [`DetectorEvent`], applying the
/// leading-edge group-delay correction described in the data model:
/// `leading_ms = trailing_ms - duration_ms - group_delay_ms`.
pub fn pulse_timestamps_ms(
    pulse: &ConfirmedPulse,
    frame_period_ms: f64,
    group_delay_ms: f64,
) -> (f64, f64, f64) {
    let trailing_ms = pulse.trailing_frame as f64 * frame_period_ms;
    let duration_ms = pulse.duration_frames as f64 * frame_period_ms;
    let leading_ms = trailing_ms - duration_ms - group_delay_ms;
    (leading_ms, trailing_ms, duration_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> PulseTuning {
        PulseTuning {
            threshold_multiplier: 3.0,
            alpha_up: 0.05,
            alpha_down: 0.9,
            min_pulse_frames: 1,
            max_pulse_frames: 5,
            cooldown_frames: 2,
            warmup_frames: 5,
        }
    }

    #[test]
    fn warmup_suppresses_all_events() {
        let mut psm = PulseStateMachine::new(tuning());
        for _ in 0..4 {
            assert!(psm.step(10.0).is_none());
        }
        assert_eq!(psm.state(), PulseState::Warmup);
    }

    #[test]
    fn confirms_a_pulse_within_duration_bounds() {
        let mut psm = PulseStateMachine::new(tuning());
        for _ in 0..5 {
            psm.step(0.01);
        }
        assert_eq!(psm.state(), PulseState::Idle);

        psm.step(5.0); // Rising
        psm.step(5.0); // Active
        let confirmed = psm.step(0.01); // Falling -> Cooldown
        assert!(confirmed.is_some());
        let c = confirmed.unwrap();
        assert!(c.duration_frames >= 1 && c.duration_frames <= 5);
    }

    #[test]
    fn rejects_pulse_outside_duration_bounds() {
        let mut psm = PulseStateMachine::new(tuning());
        for _ in 0..5 {
            psm.step(0.01);
        }
        psm.step(5.0); // Rising
        for _ in 0..10 {
            psm.step(5.0); // Active for too long
        }
        let confirmed = psm.step(0.01);
        assert!(confirmed.is_none());
    }

    #[test]
    fn cooldown_prevents_immediate_refire() {
        let mut psm = PulseStateMachine::new(tuning());
        for _ in 0..5 {
            psm.step(0.01);
        }
        psm.step(5.0);
        psm.step(5.0);
        psm.step(0.01);
        assert_eq!(psm.state(), PulseState::Cooldown);
        psm.step(5.0); // still cooling down, no transition to Rising
        assert_eq!(psm.state(), PulseState::Cooldown);
    }

    #[test]
    fn set_tuning_is_visible_through_the_tuning_getter() {
        let mut psm = PulseStateMachine::new(tuning());
        let mut t = psm.tuning();
        t.threshold_multiplier = 4.0;
        psm.set_tuning(t);
        assert_eq!(psm.tuning().threshold_multiplier, 4.0);
    }
}
