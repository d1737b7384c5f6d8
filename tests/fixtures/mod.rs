//! Synthesized I/Q test signals for the end-to-end scenario suite.
//!
//! Signals are generated one second at a time at the true 2 Msps input
//! rate and fed straight through [`Pipeline::process_chunk`] so the full
//! decimation cascade and every detector see exactly what a live
//! front end would hand them. Nothing here is retained across seconds:
//! callers loop second-by-second and let each chunk drop before the next
//! is synthesized, so memory stays bounded regardless of run length.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use wwv_sync_core::config::Station;
use wwv_sync_core::pipeline::Pipeline;
use wwv_sync_core::sample::Sample;

pub const INPUT_RATE_HZ: f64 = 2_000_000.0;

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// One additive tone burst placed at `start_ms` within a one-second
/// buffer.
#[derive(Debug, Clone, Copy)]
pub struct Burst {
    pub start_ms: f64,
    pub duration_ms: f64,
    pub tone_hz: f64,
    pub amplitude: f32,
}

/// What to synthesize for one second of broadcast.
#[derive(Debug, Clone, Default)]
pub struct SecondPlan {
    pub bursts: Vec<Burst>,
    pub noise_amplitude: f32,
}

impl SecondPlan {
    pub fn silence(noise_amplitude: f32) -> Self {
        Self {
            bursts: Vec::new(),
            noise_amplitude,
        }
    }

    pub fn with_burst(mut self, burst: Burst) -> Self {
        self.bursts.push(burst);
        self
    }
}

/// Render a [`SecondPlan`] to one second of 2 Msps complex baseband.
pub fn synth_second(rng: &mut StdRng, plan: &SecondPlan) -> Vec<Sample> {
    let n = INPUT_RATE_HZ as usize;
    let mut buf = vec![Sample::new(0.0, 0.0); n];
    if plan.noise_amplitude > 0.0 {
        let noise = Normal::new(0.0, plan.noise_amplitude as f64).expect("valid AWGN sigma");
        for s in buf.iter_mut() {
            let ni = noise.sample(rng) as f32;
            let nq = noise.sample(rng) as f32;
            *s = Sample::new(ni, nq);
        }
    }
    for burst in &plan.bursts {
        let start = ((burst.start_ms / 1000.0) * INPUT_RATE_HZ) as usize;
        let len = ((burst.duration_ms / 1000.0) * INPUT_RATE_HZ) as usize;
        for k in 0..len {
            let idx = start + k;
            if idx >= n {
                break;
            }
            let t = idx as f64 / INPUT_RATE_HZ;
            let phase = 2.0 * PI * burst.tone_hz * t;
            buf[idx] += Sample::new(
                burst.amplitude * phase.cos() as f32,
                burst.amplitude * phase.sin() as f32,
            );
        }
    }
    buf
}

/// High-SNR amplitude used throughout the scenario suite; the detectors'
/// threshold multipliers (3.0, see `DetectorConfig`) are comfortably
/// cleared against the default noise floor.
pub const SIGNAL_AMPLITUDE: f32 = 1.0;
pub const NOISE_AMPLITUDE: f32 = 0.02;

/// The ordinary schedule plan for one second of a clean broadcast
/// minute: a tick at every second except 0 (marker), 29 and 59 (silent
/// guard seconds).
pub fn schedule_plan(second_of_minute: u8, station: Station, noise_amplitude: f32) -> SecondPlan {
    let base = SecondPlan::silence(noise_amplitude);
    match second_of_minute {
        0 => base.with_burst(Burst {
            start_ms: 0.0,
            duration_ms: 800.0,
            tone_hz: station.hour_marker_hz(),
            amplitude: SIGNAL_AMPLITUDE,
        }),
        29 | 59 => base,
        _ => base.with_burst(Burst {
            start_ms: 0.0,
            duration_ms: 5.0,
            tone_hz: station.tick_hz(),
            amplitude: SIGNAL_AMPLITUDE,
        }),
    }
}

/// A schedule plan with three extra 15 ms spurious bursts crowded in
/// right after the ordinary tick, exercising cooldown rejection.
pub fn multipath_plan(station: Station, noise_amplitude: f32) -> SecondPlan {
    let mut plan = schedule_plan(12, station, noise_amplitude);
    for i in 0..3 {
        plan = plan.with_burst(Burst {
            start_ms: 20.0 + i as f64 * 40.0,
            duration_ms: 15.0,
            tone_hz: station.tick_hz(),
            amplitude: SIGNAL_AMPLITUDE,
        });
    }
    plan
}

/// Drive `pipeline` for `seconds` consecutive one-second chunks, with
/// `plan_for(second_index)` choosing what each second contains.
/// `second_index` is a free-running counter across the whole run, not
/// reset per minute; callers map it onto `second_of_minute` themselves.
pub fn run_seconds<F>(pipeline: &mut Pipeline, rng: &mut StdRng, seconds: u32, mut plan_for: F)
where
    F: FnMut(u32) -> SecondPlan,
{
    for second_index in 0..seconds {
        let plan = plan_for(second_index);
        let chunk = synth_second(rng, &plan);
        pipeline.process_chunk(&chunk).expect("chunk processing must not fail on well-formed input");
    }
}
