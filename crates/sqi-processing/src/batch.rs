//! Parallel analysis of many recordings
//!
//! Recordings are independent: each one runs on the blocking pool, at most
//! `max_concurrency` at a time, and a failing or panicking recording only
//! produces a `Failed` outcome for itself.

use crate::config::QualityConfig;
use crate::pipeline::{analyze, QualityReport};
use serde::{Deserialize, Serialize};
use sqi_core::{BeatTrain, SqiError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// One named recording to analyze
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub name: String,
    pub train: BeatTrain,
}

impl BatchJob {
    pub fn new(name: impl Into<String>, train: BeatTrain) -> Self {
        Self {
            name: name.into(),
            train,
        }
    }
}

/// Result for one recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Analyzed { name: String, report: Box<QualityReport> },
    Failed { name: String, error: SqiError },
}

impl BatchOutcome {
    pub fn name(&self) -> &str {
        match self {
            BatchOutcome::Analyzed { name, .. } | BatchOutcome::Failed { name, .. } => name,
        }
    }

    pub fn report(&self) -> Option<&QualityReport> {
        match self {
            BatchOutcome::Analyzed { report, .. } => Some(report),
            BatchOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&SqiError> {
        match self {
            BatchOutcome::Failed { error, .. } => Some(error),
            BatchOutcome::Analyzed { .. } => None,
        }
    }
}

/// Aggregate counts over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub recordings: usize,
    pub analyzed: usize,
    pub failed: usize,
    /// Failures caused by an unusable beat population rather than bad input
    pub insufficient_basis: usize,
    pub total_beats: usize,
    pub flagged_beats: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let mut summary = BatchSummary {
            recordings: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                BatchOutcome::Analyzed { report, .. } => {
                    summary.analyzed += 1;
                    summary.total_beats += report.beat_count;
                    summary.flagged_beats += report.beat_quality.outlier_count();
                }
                BatchOutcome::Failed { error, .. } => {
                    summary.failed += 1;
                    if error.is_insufficient_basis() {
                        summary.insufficient_basis += 1;
                    }
                }
            }
        }
        summary
    }

    /// Fraction of analyzed beats that ended up flagged
    pub fn flagged_fraction(&self) -> f64 {
        if self.total_beats == 0 {
            0.0
        } else {
            self.flagged_beats as f64 / self.total_beats as f64
        }
    }
}

/// Analyze all `jobs`, returning outcomes in input order
pub async fn analyze_batch(
    jobs: Vec<BatchJob>,
    config: QualityConfig,
    max_concurrency: usize,
) -> Vec<BatchOutcome> {
    let total = jobs.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let config = Arc::new(config);
    let mut names = Vec::with_capacity(total);
    let mut set = JoinSet::new();

    for (index, job) in jobs.into_iter().enumerate() {
        names.push(job.name.clone());
        let semaphore = Arc::clone(&semaphore);
        let config = Arc::clone(&config);

        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let name = job.name;
            let result = tokio::task::spawn_blocking(move || analyze(job.train, (*config).clone())).await;

            let outcome = match result {
                Ok(Ok(report)) => BatchOutcome::Analyzed {
                    name,
                    report: Box::new(report),
                },
                Ok(Err(error)) => BatchOutcome::Failed { name, error },
                Err(join_error) => BatchOutcome::Failed {
                    error: SqiError::BatchTaskFailed {
                        recording: name.clone(),
                        message: join_error.to_string(),
                    },
                    name,
                },
            };
            (index, outcome)
        });
    }

    let mut slots: Vec<Option<BatchOutcome>> = vec![None; total];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                if let Some(error) = outcome.error() {
                    warn!(recording = outcome.name(), %error, "recording failed");
                }
                slots[index] = Some(outcome);
            }
            Err(e) => warn!(error = %e, "batch task aborted"),
        }
    }

    let outcomes: Vec<BatchOutcome> = slots
        .into_iter()
        .zip(names)
        .map(|(slot, name)| {
            slot.unwrap_or_else(|| BatchOutcome::Failed {
                error: SqiError::BatchTaskFailed {
                    recording: name.clone(),
                    message: "task did not complete".to_string(),
                },
                name,
            })
        })
        .collect();

    let summary = BatchSummary::from_outcomes(&outcomes);
    info!(
        recordings = summary.recordings,
        analyzed = summary.analyzed,
        failed = summary.failed,
        "batch complete"
    );
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular_train(beats: usize) -> BeatTrain {
        let (first, period, hw) = (50usize, 100usize, 30i64);
        let len = first + period * beats;
        let ibeats: Vec<usize> = (0..beats).map(|k| first + period * k).collect();
        let mut x = vec![0.0; len];
        for &b in &ibeats {
            for j in -hw..=hw {
                let i = b as i64 + j;
                if i >= 0 && (i as usize) < len {
                    x[i as usize] = f64::max(x[i as usize], 1.0 - j.abs() as f64 / hw as f64);
                }
            }
        }
        BeatTrain::from_series(&x, ibeats, 100.0, 0.0).unwrap()
    }

    /// Every fifth interval doubled
    fn skewed_train() -> BeatTrain {
        let mut ibeats = vec![50usize];
        for k in 1..30 {
            let step = if k % 5 == 0 { 200 } else { 100 };
            ibeats.push(ibeats[k - 1] + step);
        }
        let len = ibeats[29] + 100;
        let mut x = vec![0.0; len];
        for &b in &ibeats {
            x[b] = 1.0;
        }
        BeatTrain::from_series(&x, ibeats, 100.0, 0.0).unwrap()
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let jobs = vec![
            BatchJob::new("a", regular_train(20)),
            BatchJob::new("skewed", skewed_train()),
            BatchJob::new("b", regular_train(25)),
        ];

        let outcomes = analyze_batch(jobs, QualityConfig::standard(), 2).await;
        let names: Vec<&str> = outcomes.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["a", "skewed", "b"]);

        assert!(outcomes[0].report().is_some());
        assert!(outcomes[1].error().unwrap().is_insufficient_basis());
        assert_eq!(outcomes[2].report().unwrap().beat_count, 25);

        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.analyzed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.insufficient_basis, 1);
        assert_eq!(summary.total_beats, 45);
        assert_eq!(summary.flagged_beats, 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes = analyze_batch(Vec::new(), QualityConfig::standard(), 4).await;
        assert!(outcomes.is_empty());
        assert_eq!(BatchSummary::from_outcomes(&outcomes).flagged_fraction(), 0.0);
    }
}
