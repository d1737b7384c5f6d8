use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wwv_sync_core::decimator::Decimator;
use wwv_sync_core::sample::Sample;

fn bench_decimator_chunk(c: &mut Criterion) {
    let chunk: Vec<Sample> = (0..200_000)
        .map(|n| {
            let t = n as f64 / 2_000_000.0;
            Sample::new((2.0 * std::f64::consts::PI * 1000.0 * t).sin() as f32, 0.0)
        })
        .collect();

    c.bench_function("decimator_process_chunk_200k_samples", |b| {
        let mut dec = Decimator::new();
        let mut detector_out = Vec::with_capacity(1 << 16);
        let mut display_out = Vec::with_capacity(1 << 14);
        b.iter(|| {
            detector_out.clear();
            display_out.clear();
            dec.process_chunk(black_box(&chunk), &mut detector_out, &mut display_out)
                .unwrap();
            black_box(&detector_out);
        });
    });
}

criterion_group!(benches, bench_decimator_chunk);
criterion_main!(benches);
