//! Batch report written as JSON

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqi_processing::{BatchOutcome, BatchSummary, QualityProfile};

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub profile: QualityProfile,
    pub summary: BatchSummary,
    pub recordings: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn new(profile: QualityProfile, recordings: Vec<BatchOutcome>) -> Self {
        Self {
            generated_at: Utc::now(),
            profile,
            summary: BatchSummary::from_outcomes(&recordings),
            recordings,
        }
    }

    /// One line per recording for the terminal
    pub fn summary_lines(&self) -> Vec<String> {
        self.recordings
            .iter()
            .map(|outcome| match outcome {
                BatchOutcome::Analyzed { name, report } => format!(
                    "{}: {} beats, {} flagged, template {} samples",
                    name,
                    report.beat_count,
                    report.beat_quality.outlier_count(),
                    report.template.len()
                ),
                BatchOutcome::Failed { name, error } => format!("{}: failed ({})", name, error),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqi_core::{AnalysisStage, SqiError};

    #[test]
    fn test_report_of_failures() {
        let outcomes = vec![BatchOutcome::Failed {
            name: "rec".to_string(),
            error: SqiError::insufficient(AnalysisStage::IbiFilter, "skewed"),
        }];
        let report = BatchReport::new(QualityProfile::Standard, outcomes);

        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.insufficient_basis, 1);
        assert!(report.summary_lines()[0].starts_with("rec: failed"));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("generated_at"));
    }
}
