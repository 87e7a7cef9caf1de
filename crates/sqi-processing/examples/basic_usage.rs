//! Basic usage of the beat quality analysis
//!
//! Simulates a PPG-like recording, corrupts one beat and walks through the
//! template, the three similarity scores and the geometric beat outliers.

use sqi_core::{SqiMethod, SqiResult};
use sqi_processing::{QsqiAnalysis, QualityConfig};
use sqi_simulation::{NoiseConfig, PulseShape, PulseTrainConfig, PulseTrainSimulator};

fn main() -> SqiResult<()> {
    println!("=== SQI Basic Usage ===\n");

    let config = PulseTrainConfig {
        beat_count: 40,
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
        seed: Some(42),
        ..PulseTrainConfig::default()
    };
    let mut simulator = PulseTrainSimulator::new(config)?;
    let train = simulator.generate()?;
    let train = simulator.corrupt_beat(&train, 25, 30)?;
    println!(
        "Recording: {} beats at {} Hz, mean IBI {:.3} s",
        train.beat_count(),
        train.fps(),
        train.mean_ibi()
    );

    let mut analysis = QsqiAnalysis::new(train, QualityConfig::standard())?;
    if let Some(template) = analysis.template() {
        println!(
            "Template: {} samples from {} beats (kurtosis {:.2}, skewness {:.2})",
            template.len(),
            template.contributing_beats.len(),
            template.kurtosis,
            template.skewness
        );
    }

    for method in SqiMethod::ALL {
        let scores = analysis.score(method)?;
        println!(
            "  {:<10} mean {:.3}  min {:.3}",
            method.name(),
            scores.mean().unwrap_or(0.0),
            scores.min().unwrap_or(0.0)
        );
    }

    let report = analysis.report()?;
    println!("\nFlagged beats: {:?}", report.beat_quality.outlier_beats());
    for beat in report.beat_quality.outlier_beats() {
        println!("  beat {}: {:?}", beat, report.beat_quality.reasons[beat]);
    }

    println!("\nStage timings:");
    for m in &report.metrics {
        println!("  {:<20} {:>8} us  {} -> {}", m.stage, m.elapsed_us, m.input_count, m.output_count);
    }

    Ok(())
}
