//! Pulse train simulator with controllable rhythm, noise and artifacts

use crate::pulse_patterns::PulseShape;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use sqi_core::{BeatTrain, SqiError, SqiResult, Waveform};

/// Configuration for pulse train simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseTrainConfig {
    /// Sampling rate in Hz
    pub fps: f64,
    pub beat_count: usize,
    /// Nominal beat period in seconds
    pub period_s: f64,
    /// Time of the first onset in seconds
    pub first_beat_s: f64,
    pub shape: PulseShape,
    pub noise: NoiseConfig,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

/// Noise configuration for realistic recordings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise standard deviation (0.0 = no noise)
    pub gaussian_std: f64,
    /// Baseline wander amplitude
    pub baseline_wander: f64,
    /// Standard deviation of the beat period in seconds
    pub ibi_jitter_std: f64,
}

impl NoiseConfig {
    /// No noise at all: the train repeats one exact pulse
    pub fn none() -> Self {
        Self {
            gaussian_std: 0.0,
            baseline_wander: 0.0,
            ibi_jitter_std: 0.0,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            gaussian_std: 0.01,
            baseline_wander: 0.05,
            ibi_jitter_std: 0.02,
        }
    }
}

impl Default for PulseTrainConfig {
    fn default() -> Self {
        Self {
            fps: 100.0,
            beat_count: 50,
            period_s: 1.0,
            first_beat_s: 0.5,
            shape: PulseShape::Triangular {
                half_width_s: 0.3,
                amplitude: 1.0,
            },
            noise: NoiseConfig::default(),
            seed: None,
        }
    }
}

impl PulseTrainConfig {
    /// Noise-free regular train
    pub fn regular(beat_count: usize, shape: PulseShape) -> Self {
        Self {
            beat_count,
            shape,
            noise: NoiseConfig::none(),
            seed: Some(0),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SqiResult<()> {
        Waveform::validate_sampling_rate(self.fps)?;
        if self.beat_count < 2 {
            return Err(simulation_error(format!(
                "at least 2 beats are required, got {}",
                self.beat_count
            )));
        }
        if !(self.period_s.is_finite() && self.period_s * self.fps >= 2.0) {
            return Err(simulation_error(format!(
                "period of {} s is shorter than two samples",
                self.period_s
            )));
        }
        if !(self.first_beat_s.is_finite() && self.first_beat_s >= 0.0) {
            return Err(simulation_error("first beat time must be non-negative"));
        }
        if !self.shape.is_valid() {
            return Err(simulation_error(format!(
                "invalid pulse shape {:?}",
                self.shape
            )));
        }
        let n = &self.noise;
        if [n.gaussian_std, n.baseline_wander, n.ibi_jitter_std]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(simulation_error("noise parameters must be non-negative"));
        }
        Ok(())
    }
}

fn simulation_error(message: impl Into<String>) -> SqiError {
    SqiError::SimulationError {
        message: message.into(),
    }
}

/// Synthetic pulse train generator
#[derive(Debug)]
pub struct PulseTrainSimulator {
    config: PulseTrainConfig,
    rng: StdRng,
    normal_dist: Normal<f64>,
}

impl PulseTrainSimulator {
    /// Create new simulator with configuration
    pub fn new(config: PulseTrainConfig) -> SqiResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let normal_dist = Normal::new(0.0, 1.0)
            .map_err(|e| simulation_error(format!("Failed to create normal distribution: {}", e)))?;

        Ok(Self {
            config,
            rng,
            normal_dist,
        })
    }

    pub fn config(&self) -> &PulseTrainConfig {
        &self.config
    }

    /// Onset indices, jittered by the configured IBI variability
    fn onsets(&mut self) -> Vec<usize> {
        let fps = self.config.fps;
        let period = self.config.period_s * fps;
        let jitter = self.config.noise.ibi_jitter_std * fps;
        let min_step = (period / 2.0).max(1.0);

        let mut onsets = Vec::with_capacity(self.config.beat_count);
        let mut t = (self.config.first_beat_s * fps).round();
        for _ in 0..self.config.beat_count {
            onsets.push(t as usize);
            let step = period + jitter * self.normal_dist.sample(&mut self.rng);
            t += step.max(min_step).round();
        }
        onsets
    }

    /// Generate one recording
    pub fn generate(&mut self) -> SqiResult<BeatTrain> {
        let fps = self.config.fps;
        let shape = self.config.shape;
        let ibeats = self.onsets();

        let (lead, tail) = shape.support(fps);
        let last = ibeats.last().copied().unwrap_or(0);
        let len = last + (self.config.period_s * fps).round() as usize + tail.max(0) as usize;

        let mut x = vec![0.0; len];
        for &b in &ibeats {
            for offset in lead..=tail {
                let i = b as i64 + offset;
                if i >= 0 && (i as usize) < len {
                    x[i as usize] += shape.value_at(offset, fps);
                }
            }
        }

        let noise = self.config.noise.clone();
        if noise.baseline_wander > 0.0 || noise.gaussian_std > 0.0 {
            for (i, v) in x.iter_mut().enumerate() {
                let t = i as f64 / fps;
                *v += noise.baseline_wander * (2.0 * std::f64::consts::PI * 0.1 * t).sin();
                *v += noise.gaussian_std * self.normal_dist.sample(&mut self.rng);
            }
        }

        BeatTrain::new(Waveform::new(x, fps, 0.0)?, ibeats)
    }

    /// Copy of `train` with `[b - half_window, b + half_window)` around onset
    /// `beat` replaced by uniform noise in `[0, 1)`
    pub fn corrupt_beat(
        &mut self,
        train: &BeatTrain,
        beat: usize,
        half_window: usize,
    ) -> SqiResult<BeatTrain> {
        let b = *train.ibeats().get(beat).ok_or_else(|| {
            simulation_error(format!("beat {} out of range", beat))
        })?;

        let mut x = train.x().to_vec();
        let start = b.saturating_sub(half_window);
        let end = (b + half_window).min(x.len());
        for v in &mut x[start..end] {
            *v = self.rng.gen::<f64>();
        }

        let waveform = Waveform::new(x, train.fps(), train.waveform().lpad())?;
        BeatTrain::new(waveform, train.ibeats().to_vec())
    }
}

/// Copy of `train` with onset `beat` detected `shift` samples off
pub fn with_onset_shift(train: &BeatTrain, beat: usize, shift: i64) -> SqiResult<BeatTrain> {
    let mut ibeats = train.ibeats().to_vec();
    let b = ibeats
        .get(beat)
        .copied()
        .ok_or_else(|| simulation_error(format!("beat {} out of range", beat)))?;

    let moved = b as i64 + shift;
    if moved < 0 {
        return Err(simulation_error("shifted onset before the recording start"));
    }
    ibeats[beat] = moved as usize;

    BeatTrain::new(train.waveform().clone(), ibeats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> PulseShape {
        PulseShape::Triangular {
            half_width_s: 0.3,
            amplitude: 1.0,
        }
    }

    #[test]
    fn test_regular_train_layout() {
        let mut simulator = PulseTrainSimulator::new(PulseTrainConfig::regular(20, triangle())).unwrap();
        let train = simulator.generate().unwrap();

        assert_eq!(train.beat_count(), 20);
        assert_eq!(train.ibeats()[0], 50);
        assert!(train.ibeats().windows(2).all(|w| w[1] - w[0] == 100));
        assert_eq!(train.x().len(), 50 + 19 * 100 + 100 + 30);
        assert_eq!(train.x()[50], 1.0);
        assert_eq!(train.x()[150 + 15], 0.5);
    }

    #[test]
    fn test_regular_train_repeats_exactly() {
        let mut simulator = PulseTrainSimulator::new(PulseTrainConfig::regular(10, triangle())).unwrap();
        let train = simulator.generate().unwrap();
        let x = train.x();

        for k in 1..train.beat_count() {
            let (a, b) = (train.ibeats()[0], train.ibeats()[k]);
            assert_eq!(x[a - 40..a + 40], x[b - 40..b + 40]);
        }
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let config = PulseTrainConfig {
            seed: Some(7),
            ..PulseTrainConfig::default()
        };
        let a = PulseTrainSimulator::new(config.clone()).unwrap().generate().unwrap();
        let b = PulseTrainSimulator::new(config).unwrap().generate().unwrap();

        assert_eq!(a.x(), b.x());
        assert_eq!(a.ibeats(), b.ibeats());
    }

    #[test]
    fn test_corrupt_beat() {
        let mut simulator = PulseTrainSimulator::new(PulseTrainConfig::regular(10, triangle())).unwrap();
        let train = simulator.generate().unwrap();
        let corrupted = simulator.corrupt_beat(&train, 4, 30).unwrap();

        let b = train.ibeats()[4];
        assert_eq!(corrupted.ibeats(), train.ibeats());
        assert_ne!(corrupted.x()[b - 30..b + 30], train.x()[b - 30..b + 30]);
        assert_eq!(corrupted.x()[..b - 30], train.x()[..b - 30]);
        assert!(corrupted.x()[b - 30..b + 30].iter().all(|v| (0.0..1.0).contains(v)));
        assert!(simulator.corrupt_beat(&train, 10, 30).is_err());
    }

    #[test]
    fn test_onset_shift() {
        let mut simulator = PulseTrainSimulator::new(PulseTrainConfig::regular(10, triangle())).unwrap();
        let train = simulator.generate().unwrap();

        let shifted = with_onset_shift(&train, 3, 5).unwrap();
        assert_eq!(shifted.ibeats()[3], train.ibeats()[3] + 5);
        assert_eq!(shifted.x(), train.x());
        assert!(with_onset_shift(&train, 3, 100).is_err());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = PulseTrainConfig::regular(1, triangle());
        assert!(PulseTrainSimulator::new(config.clone()).is_err());

        config.beat_count = 10;
        config.noise.gaussian_std = -1.0;
        assert!(matches!(
            PulseTrainSimulator::new(config).unwrap_err(),
            SqiError::SimulationError { .. }
        ));
    }
}
