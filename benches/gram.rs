//! Hot-path benchmarks for the per-iteration representation work:
//! Gram matrices and a single feature-extraction pass.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use burn::backend::NdArray;
use burn::prelude::*;
use burn::tensor::Distribution;

use pastiche::extractor::FeatureExtractorConfig;
use pastiche::loss::gram;

type B = NdArray;

fn random_activation(channels: usize, side: usize) -> Tensor<B, 4> {
    let device = Default::default();
    Tensor::random(
        [1, channels, side, side],
        Distribution::Uniform(-1.0, 1.0),
        &device,
    )
}

fn bench_gram(c: &mut Criterion) {
    let shallow = random_activation(64, 224);
    let deep = random_activation(512, 28);

    let mut group = c.benchmark_group("gram");
    group.bench_function("64ch_224px", |b| {
        b.iter(|| gram(black_box(shallow.clone())))
    });
    group.bench_function("512ch_28px", |b| {
        b.iter(|| gram(black_box(deep.clone())))
    });
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let device = Default::default();
    let extractor = FeatureExtractorConfig::new().init::<B>(&device);
    let image = random_activation(3, 224);
    let layers = ["conv_1", "conv_2", "conv_3", "conv_4", "conv_5"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    c.bench_function("extract_5_layers_224px", |b| {
        b.iter(|| extractor.extract(black_box(image.clone()), &layers).unwrap())
    });
}

criterion_group!(benches, bench_gram, bench_extract);
criterion_main!(benches);
