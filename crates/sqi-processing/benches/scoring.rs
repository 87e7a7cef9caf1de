//! Benchmarks for template construction and beat scoring
//!
//! Run with: cargo bench -p sqi-processing --bench scoring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sqi_core::{BeatTrain, SqiMethod};
use sqi_processing::dtw::dtw_distance;
use sqi_processing::scoring::scorer_for;
use sqi_processing::{BeatQualityAnalyzer, BeatQualityParams, QsqiAnalysis, QualityConfig};
use sqi_simulation::{NoiseConfig, PulseShape, PulseTrainConfig, PulseTrainSimulator};

fn recording(beats: usize) -> BeatTrain {
    let config = PulseTrainConfig {
        beat_count: beats,
        shape: PulseShape::PpgLike {
            rise_s: 0.15,
            fall_s: 0.4,
            amplitude: 1.0,
        },
        noise: NoiseConfig {
            gaussian_std: 0.005,
            baseline_wander: 0.02,
            ibi_jitter_std: 0.01,
        },
        seed: Some(11),
        ..PulseTrainConfig::default()
    };
    PulseTrainSimulator::new(config)
        .and_then(|mut s| s.generate())
        .expect("benchmark recording")
}

fn bench_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("template");

    for beats in [30, 120, 480] {
        let train = recording(beats);
        group.throughput(Throughput::Elements(beats as u64));
        group.bench_with_input(BenchmarkId::new("build", beats), &train, |b, train| {
            b.iter(|| QsqiAnalysis::new(black_box(train.clone()), QualityConfig::standard()))
        });
    }

    group.finish();
}

fn bench_scorers(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let train = recording(120);
    let analysis = QsqiAnalysis::new(train.clone(), QualityConfig::standard()).expect("template");
    let template = analysis.template().cloned().expect("template");

    group.throughput(Throughput::Elements(train.interval_count() as u64));
    for method in SqiMethod::ALL {
        let scorer = scorer_for(method, 10);
        group.bench_function(method.name(), |b| {
            b.iter(|| scorer.score(black_box(&train), black_box(&template)))
        });
    }

    group.finish();
}

fn bench_dtw(c: &mut Criterion) {
    let mut group = c.benchmark_group("dtw");

    for len in [12, 60, 120] {
        let a: Vec<f64> = (0..len).map(|i| (i as f64 * 0.1).sin()).collect();
        let b: Vec<f64> = (0..len).map(|i| (i as f64 * 0.1 + 0.3).sin()).collect();
        group.bench_with_input(BenchmarkId::new("distance", len), &len, |bench, _| {
            bench.iter(|| dtw_distance(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_beat_quality(c: &mut Criterion) {
    let train = recording(120);
    let analyzer = BeatQualityAnalyzer::new(BeatQualityParams::default());

    c.bench_function("beat_quality/detect_outliers", |b| {
        b.iter(|| analyzer.detect_beat_outliers(black_box(&train)))
    });
}

criterion_group!(benches, bench_template, bench_scorers, bench_dtw, bench_beat_quality);
criterion_main!(benches);
