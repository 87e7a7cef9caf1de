//! Recording inputs: JSON files and synthetic recordings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqi_core::{BeatTrain, SqiResult};
use sqi_processing::BatchJob;
use sqi_simulation::{NoiseConfig, PulseShape, PulseTrainConfig, PulseTrainSimulator};
use std::path::Path;
use tracing::debug;

/// On-disk recording: waveform samples plus detected beat onsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingFile {
    #[serde(default)]
    pub name: Option<String>,
    pub fps: f64,
    #[serde(default)]
    pub lpad: f64,
    pub samples: Vec<f64>,
    pub ibeats: Vec<usize>,
}

impl RecordingFile {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("malformed recording JSON")
    }

    /// Validate into a batch job, naming it `fallback` when the file has no name
    pub fn into_job(self, fallback: &str) -> SqiResult<BatchJob> {
        let name = self.name.unwrap_or_else(|| fallback.to_string());
        let train = BeatTrain::from_series(&self.samples, self.ibeats, self.fps, self.lpad)?;
        Ok(BatchJob::new(name, train))
    }
}

/// Read and validate one recording file
pub fn load_recording(path: &Path) -> Result<BatchJob> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file = RecordingFile::from_json(&json)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let fallback = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let job = file
        .into_job(&fallback)
        .with_context(|| format!("invalid recording {}", path.display()))?;

    debug!(recording = %job.name, beats = job.train.beat_count(), "loaded recording");
    Ok(job)
}

/// `count` synthetic PPG-like recordings with slightly varying upstrokes.
///
/// Every third recording carries one corrupted beat.
pub fn simulate(count: usize, seed: u64) -> Result<Vec<BatchJob>> {
    let mut jobs = Vec::with_capacity(count);

    for i in 0..count {
        let config = PulseTrainConfig {
            beat_count: 40,
            shape: PulseShape::PpgLike {
                rise_s: 0.12 + 0.01 * (i % 4) as f64,
                fall_s: 0.4,
                amplitude: 1.0,
            },
            noise: NoiseConfig {
                gaussian_std: 0.005,
                baseline_wander: 0.02,
                ibi_jitter_std: 0.01,
            },
            seed: Some(seed.wrapping_add(i as u64)),
            ..PulseTrainConfig::default()
        };

        let mut simulator = PulseTrainSimulator::new(config)?;
        let mut train = simulator.generate()?;
        if i % 3 == 2 {
            train = simulator.corrupt_beat(&train, 20, 25)?;
        }

        jobs.push(BatchJob::new(format!("sim-{:03}", i), train));
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recording() {
        let json = r#"{ "fps": 10.0, "samples": [0, 1, 0, 1, 0, 1], "ibeats": [1, 3, 5] }"#;
        let file = RecordingFile::from_json(json).unwrap();
        assert_eq!(file.lpad, 0.0);
        assert!(file.name.is_none());

        let job = file.into_job("rec").unwrap();
        assert_eq!(job.name, "rec");
        assert_eq!(job.train.beat_count(), 3);
    }

    #[test]
    fn test_invalid_recording() {
        let json = r#"{ "name": "bad", "fps": 10.0, "samples": [0, 1, 0], "ibeats": [2, 1] }"#;
        let err = RecordingFile::from_json(json).unwrap().into_job("x").unwrap_err();
        assert!(err.is_precondition());

        assert!(RecordingFile::from_json(r#"{ "fps": 10.0 }"#).is_err());
    }

    #[test]
    fn test_simulate() {
        let jobs = simulate(5, 1).unwrap();
        assert_eq!(jobs.len(), 5);
        assert_eq!(jobs[4].name, "sim-004");
        assert!(jobs.iter().all(|j| j.train.beat_count() == 40));
    }
}
