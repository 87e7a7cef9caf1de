use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use sqi_core::BeatTrain;
use sqi_processing::regression::theil_sen;
use sqi_processing::stats::{mad_outlier_scores, percentile};
use sqi_processing::{
    BeatScorer, BeatSlicer, DirectScorer, ElasticScorer, QsqiAnalysis, QualityConfig,
    ResampledScorer, Template, WindowPolicy,
};
use sqi_simulation::{PulseShape, PulseTrainConfig, PulseTrainSimulator};

const MIN_PROPTEST_CASES: u32 = 64;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn reference_template() -> Template {
    let shape = PulseShape::Triangular {
        half_width_s: 0.3,
        amplitude: 1.0,
    };
    let train = PulseTrainSimulator::new(PulseTrainConfig::regular(20, shape))
        .unwrap()
        .generate()
        .unwrap();
    let analysis = QsqiAnalysis::new(train, QualityConfig::standard()).unwrap();
    analysis.template().cloned().unwrap()
}

/// Arbitrary waveform with strictly ascending onsets inside it
fn arbitrary_train() -> impl Strategy<Value = BeatTrain> {
    (
        prop::collection::vec(-1.0f64..1.0, 300..900),
        prop::collection::vec(1usize..250, 2..12),
    )
        .prop_filter_map("onsets must fit the waveform", |(x, steps)| {
            let mut ibeats = Vec::with_capacity(steps.len());
            let mut b = 0usize;
            for step in steps {
                b += step;
                ibeats.push(b);
            }
            if ibeats.last().copied().unwrap_or(usize::MAX) >= x.len() {
                return None;
            }
            BeatTrain::from_series(&x, ibeats, 100.0, 0.0).ok()
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        ..ProptestConfig::default()
    })]

    #[test]
    fn scores_stay_in_unit_interval(train in arbitrary_train()) {
        let template = reference_template();
        let scorers: Vec<Box<dyn BeatScorer>> = vec![
            Box::new(DirectScorer),
            Box::new(ResampledScorer),
            Box::new(ElasticScorer::new(10)),
        ];

        for scorer in scorers {
            let scores = scorer.score(&train, &template).unwrap();
            prop_assert_eq!(scores.len(), train.interval_count());
            for v in &scores.values {
                prop_assert!((0.0..=1.0).contains(v), "{} scored {}", scorer.method(), v);
            }
        }
    }

    #[test]
    fn fixed_slicing_of_regular_onsets(
        period in 10usize..200,
        beats in 3usize..30,
    ) {
        let first = period;
        let ibeats: Vec<usize> = (0..beats).map(|k| first + period * k).collect();
        let x: Vec<f64> = (0..first + period * beats).map(|i| (i % period) as f64).collect();

        let slices = BeatSlicer::new(WindowPolicy::fixed()).slice(&x, &ibeats).unwrap();
        prop_assert_eq!(slices.len(), beats - 1);
        for (i, s) in slices.iter().enumerate() {
            prop_assert_eq!(s.beat, i);
            prop_assert!(s.len() >= period);
        }
    }

    #[test]
    fn mad_scores_are_non_negative(values in prop::collection::vec(-1e6f64..1e6, 1..60)) {
        let scores = mad_outlier_scores(&values);
        prop_assert_eq!(scores.len(), values.len());
        prop_assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0));
    }

    #[test]
    fn percentile_is_monotonic(
        values in prop::collection::vec(-1e3f64..1e3, 1..50),
        q1 in 0.0f64..=100.0,
        q2 in 0.0f64..=100.0,
    ) {
        let (lo, hi) = if q1 <= q2 { (q1, q2) } else { (q2, q1) };
        prop_assert!(percentile(&values, lo) <= percentile(&values, hi) + 1e-9);
    }

    #[test]
    fn theil_sen_recovers_exact_lines(
        slope in -50.0f64..50.0,
        intercept in -10.0f64..10.0,
        n in 3usize..40,
    ) {
        let t: Vec<f64> = (0..n).map(|i| i as f64 / 100.0).collect();
        let y: Vec<f64> = t.iter().map(|&v| slope * v + intercept).collect();

        let fit = theil_sen(&t, &y).unwrap();
        prop_assert!((fit.slope - slope).abs() < 1e-6);
        prop_assert!((fit.intercept - intercept).abs() < 1e-6);
    }
}
