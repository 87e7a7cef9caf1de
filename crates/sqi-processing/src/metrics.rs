//! Per-stage timing and throughput metrics

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pipeline stages that record metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Slicing,
    IbiFilter,
    ShapeFilter,
    Template,
    Scoring,
    GeometricOutliers,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Slicing => "slicing",
            Stage::IbiFilter => "ibi_filter",
            Stage::ShapeFilter => "shape_filter",
            Stage::Template => "template",
            Stage::Scoring => "scoring",
            Stage::GeometricOutliers => "geometric_outliers",
        };
        f.pad(name)
    }
}

/// Performance metrics for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage: Stage,
    /// Elapsed time in microseconds
    pub elapsed_us: u64,
    /// Items entering the stage (slices or beats)
    pub input_count: usize,
    /// Items leaving the stage
    pub output_count: usize,
    pub success: bool,
    pub error_message: Option<String>,
}

impl StageMetrics {
    /// Start timing a stage
    pub fn start(stage: Stage, input_count: usize) -> StageTimer {
        StageTimer {
            start_time: Instant::now(),
            metrics: StageMetrics {
                stage,
                elapsed_us: 0,
                input_count,
                output_count: 0,
                success: true,
                error_message: None,
            },
        }
    }

    /// Fraction of the input that survived the stage
    pub fn retention(&self) -> f64 {
        if self.input_count == 0 {
            0.0
        } else {
            self.output_count as f64 / self.input_count as f64
        }
    }
}

/// Helper for timing pipeline stages
#[derive(Debug)]
pub struct StageTimer {
    start_time: Instant,
    metrics: StageMetrics,
}

impl StageTimer {
    /// Finish timing and return metrics
    pub fn finish(mut self, output_count: usize) -> StageMetrics {
        self.metrics.elapsed_us = self.start_time.elapsed().as_micros() as u64;
        self.metrics.output_count = output_count;
        self.metrics
    }

    /// Finish with error
    pub fn finish_with_error(mut self, error: &str) -> StageMetrics {
        self.metrics.elapsed_us = self.start_time.elapsed().as_micros() as u64;
        self.metrics.success = false;
        self.metrics.error_message = Some(error.to_string());
        self.metrics
    }
}

/// Total elapsed microseconds over a set of stage metrics
pub fn total_elapsed_us(metrics: &[StageMetrics]) -> u64 {
    metrics.iter().map(|m| m.elapsed_us).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_stage_timing() {
        let timer = StageMetrics::start(Stage::IbiFilter, 40);
        std::thread::sleep(Duration::from_millis(1));
        let metrics = timer.finish(30);

        assert!(metrics.elapsed_us > 0);
        assert!(metrics.success);
        assert_eq!(metrics.output_count, 30);
        assert!((metrics.retention() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_stage_error() {
        let metrics = StageMetrics::start(Stage::Template, 10).finish_with_error("too few beats");
        assert!(!metrics.success);
        assert_eq!(metrics.error_message.as_deref(), Some("too few beats"));
        assert_eq!(metrics.retention(), 0.0);
        assert_eq!(Stage::GeometricOutliers.to_string(), "geometric_outliers");
    }
}
