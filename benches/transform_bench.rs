//! Spectrogram transform benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ensayo::dataset::Sample;
use ensayo::transform::{FeatureTransform, Identity, Spectrogram};

fn synthetic_sample(n_channels: usize, len: usize) -> Sample {
    let rate = 256.0f32;
    let channels = (0..n_channels)
        .map(|ch| {
            let freq = 4.0 + ch as f32 * 3.0;
            (0..len)
                .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin())
                .collect()
        })
        .collect();
    Sample {
        id: "bench".to_string(),
        label: 0,
        sample_rate: 256,
        channels,
    }
}

fn bench_spectrogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrogram");
    for &len in &[2_048usize, 8_192, 32_768] {
        let sample = synthetic_sample(8, len);
        let transform = Spectrogram::new(256, 128, None);
        group.bench_with_input(BenchmarkId::from_parameter(len), &sample, |b, sample| {
            b.iter(|| transform.apply(black_box(sample)).unwrap());
        });
    }
    group.finish();
}

fn bench_identity(c: &mut Criterion) {
    let sample = synthetic_sample(8, 8_192);
    let transform = Identity::new(None);
    c.bench_function("identity_8ch_8192", |b| {
        b.iter(|| transform.apply(black_box(&sample)).unwrap());
    });
}

criterion_group!(benches, bench_spectrogram, bench_identity);
criterion_main!(benches);
