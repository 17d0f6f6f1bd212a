//! Benchmarks for table construction and featurization.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use symfeat::featurize::{FeaturizerConfig, FunctionFeaturizer};

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_default_depth2", |bench| {
        bench.iter(|| {
            let config = FeaturizerConfig::default().with_depth(2);
            black_box(FunctionFeaturizer::new(config).unwrap())
        })
    });
}

fn bench_featurize(c: &mut Criterion) {
    let config = FeaturizerConfig::default().with_depth(2);
    let featurizer = FunctionFeaturizer::new(config).unwrap();
    let row = [2.0, 3.5, 0.25, 7.0];

    c.bench_function("featurize_4args_depth2", |bench| {
        bench.iter(|| black_box(featurizer.featurize(black_box(&row))))
    });
}

fn bench_labels(c: &mut Criterion) {
    let config = FeaturizerConfig::default().with_depth(2);
    let featurizer = FunctionFeaturizer::new(config).unwrap();
    let columns = ["density", "band_gap", "volume", "mass"];

    c.bench_function("labels_4cols_depth2", |bench| {
        bench.iter(|| black_box(featurizer.feature_labels(&columns, false).unwrap()))
    });
}

criterion_group!(benches, bench_build, bench_featurize, bench_labels);
criterion_main!(benches);
