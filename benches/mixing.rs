//! Benchmarks for the mixing engine
//!
//! One 20 ms block at 48 kHz per iteration:
//! - Plain summing of non-capture transmissions
//! - Capture selection among FM transmissions
//! - Effect processing with and without per-model effects

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use skywave::amplitude::FRAME_SAMPLES;
use skywave::mixing::{MixerSettings, MixingEngine, accumulate};
use skywave::test_utils::sine_f32;
use skywave::{Modulation, TransmissionSegment};
use std::hint::black_box;
use std::sync::Arc;

fn segments(count: usize, modulation: Modulation) -> Vec<TransmissionSegment> {
    (0..count)
        .map(|i| {
            TransmissionSegment::new(
                sine_f32(0.2, FRAME_SAMPLES, 3.0 + i as f64),
                modulation,
                1.0 + i as f64,
            )
        })
        .collect()
}

fn bench_accumulate(c: &mut Criterion) {
    let src = sine_f32(0.5, FRAME_SAMPLES, 5.0);
    let mut acc = vec![0.0f32; FRAME_SAMPLES];

    let mut group = c.benchmark_group("accumulate");
    group.throughput(Throughput::Elements(FRAME_SAMPLES as u64));
    group.bench_function("one_block", |b| b.iter(|| accumulate(black_box(&mut acc), black_box(&src))));
    group.finish();
}

fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix");
    group.throughput(Throughput::Elements(FRAME_SAMPLES as u64));

    for (label, modulation) in [("am", Modulation::Am), ("fm_capture", Modulation::Fm)] {
        for count in [1usize, 4, 16] {
            let engine = MixingEngine::new(Arc::new(MixerSettings::default()));
            let input = segments(count, modulation);
            let mut output = vec![0.0f32; FRAME_SAMPLES];

            group.bench_with_input(BenchmarkId::new(label, count), &input, |b, input| {
                b.iter(|| engine.mix(&mut output, 0, FRAME_SAMPLES, black_box(input), Some("arc210")))
            });
        }
    }

    let dry = MixerSettings { effect_ratio: 0.0, per_model_effects: false, ..MixerSettings::default() };
    let engine = MixingEngine::new(Arc::new(dry));
    let input = segments(4, Modulation::Am);
    let mut output = vec![0.0f32; FRAME_SAMPLES];
    group.bench_function("dry_intercom_4", |b| {
        b.iter(|| engine.mix(&mut output, 0, FRAME_SAMPLES, black_box(&input), None))
    });

    group.finish();
}

criterion_group!(benches, bench_accumulate, bench_mix);
criterion_main!(benches);
