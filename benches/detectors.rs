use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wwv_sync_core::config::Station;
use wwv_sync_core::detectors::{BcdTimeDetector, MarkerDetector, PulseDetector, TickDetector};
use wwv_sync_core::sample::Sample;

const DETECTOR_RATE_HZ: f64 = 50_000.0;

fn tone_burst(n: usize, hz: f64, rate_hz: f64) -> Vec<Sample> {
    (0..n)
        .map(|i| {
            let t = i as f64 / rate_hz;
            let phase = 2.0 * std::f64::consts::PI * hz * t;
            Sample::new(phase.cos() as f32, phase.sin() as f32)
        })
        .collect()
}

fn bench_tick_detector(c: &mut Criterion) {
    let one_second = tone_burst(DETECTOR_RATE_HZ as usize, 1000.0, DETECTOR_RATE_HZ);
    c.bench_function("tick_detector_one_second_50khz", |b| {
        let mut det = TickDetector::new(Station::Wwv);
        b.iter(|| {
            for &s in &one_second {
                black_box(det.process_sample(s));
            }
        });
    });
}

fn bench_marker_detector(c: &mut Criterion) {
    let one_second = tone_burst(DETECTOR_RATE_HZ as usize, 1000.0, DETECTOR_RATE_HZ);
    c.bench_function("marker_detector_one_second_50khz", |b| {
        let mut det = MarkerDetector::new(Station::Wwv);
        b.iter(|| {
            for &s in &one_second {
                black_box(det.process_sample(s));
            }
        });
    });
}

fn bench_bcd_time_detector(c: &mut Criterion) {
    let one_second = tone_burst(DETECTOR_RATE_HZ as usize, 100.0, DETECTOR_RATE_HZ);
    c.bench_function("bcd_time_detector_one_second_50khz", |b| {
        let mut det = BcdTimeDetector::new();
        b.iter(|| {
            for &s in &one_second {
                black_box(det.process_sample(s));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_tick_detector,
    bench_marker_detector,
    bench_bcd_time_detector
);
criterion_main!(benches);
