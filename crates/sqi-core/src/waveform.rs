//! Waveform: sampled pulsatile signal with its time base

use crate::error::{SqiError, SqiResult};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Accepted sampling rate range in Hz
pub const MIN_SAMPLING_RATE: f64 = 1.0;
pub const MAX_SAMPLING_RATE: f64 = 100_000.0;

/// Continuous single-channel pulsatile recording (PPG, ECG, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WaveformData")]
pub struct Waveform {
    samples: Vec<f64>,
    fps: f64,
    lpad: f64,
}

/// Unvalidated wire form of [`Waveform`]
#[derive(Deserialize)]
struct WaveformData {
    samples: Vec<f64>,
    fps: f64,
    #[serde(default)]
    lpad: f64,
}

impl TryFrom<WaveformData> for Waveform {
    type Error = SqiError;

    fn try_from(data: WaveformData) -> SqiResult<Self> {
        Waveform::new(data.samples, data.fps, data.lpad)
    }
}

impl Waveform {
    /// Create a waveform from samples, sample rate and left-padding offset.
    ///
    /// `lpad` aligns sample 0 to the reference time origin in (possibly
    /// fractional) samples, so that `t[i] = (i - lpad) / fps`.
    pub fn new(samples: Vec<f64>, fps: f64, lpad: f64) -> SqiResult<Self> {
        Self::validate_sampling_rate(fps)?;

        if samples.is_empty() {
            return Err(SqiError::invalid_waveform("waveform has no samples"));
        }
        if let Some(i) = samples.iter().position(|v| !v.is_finite()) {
            return Err(SqiError::invalid_waveform(format!(
                "sample {} is not finite ({})",
                i, samples[i]
            )));
        }
        if !lpad.is_finite() {
            return Err(SqiError::invalid_waveform("lpad must be finite"));
        }

        Ok(Waveform { samples, fps, lpad })
    }

    /// Create a waveform from any numeric sample type (ADC counts, f32, ...)
    pub fn from_samples<T: ToPrimitive>(samples: &[T], fps: f64, lpad: f64) -> SqiResult<Self> {
        let converted = samples
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.to_f64().ok_or_else(|| {
                    SqiError::invalid_waveform(format!("sample {} cannot be represented as f64", i))
                })
            })
            .collect::<SqiResult<Vec<f64>>>()?;

        Self::new(converted, fps, lpad)
    }

    /// Validate sampling rate
    pub fn validate_sampling_rate(rate: f64) -> SqiResult<()> {
        if !rate.is_finite() || !(MIN_SAMPLING_RATE..=MAX_SAMPLING_RATE).contains(&rate) {
            Err(SqiError::InvalidSamplingRate {
                rate,
                valid_range: format!("{}-{}Hz", MIN_SAMPLING_RATE, MAX_SAMPLING_RATE),
            })
        } else {
            Ok(())
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sampling rate in Hz
    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn lpad(&self) -> f64 {
        self.lpad
    }

    /// Time of sample `index` in seconds relative to the reference origin
    pub fn time_at(&self, index: usize) -> f64 {
        (index as f64 - self.lpad) / self.fps
    }

    /// Time axis for all samples
    pub fn time_vector(&self) -> Vec<f64> {
        (0..self.samples.len()).map(|i| self.time_at(i)).collect()
    }

    /// Recording duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_creation() {
        let waveform = Waveform::new(vec![0.0; 300], 30.0, 0.0).unwrap();

        assert_eq!(waveform.len(), 300);
        assert!((waveform.duration() - 10.0).abs() < 1e-12);
        assert_eq!(waveform.fps(), 30.0);
    }

    #[test]
    fn test_time_axis_with_lpad() {
        let waveform = Waveform::new(vec![1.0; 10], 100.0, 2.5).unwrap();

        assert!((waveform.time_at(0) + 0.025).abs() < 1e-12);
        assert!((waveform.time_at(5) - 0.025).abs() < 1e-12);
        assert_eq!(waveform.time_vector().len(), 10);
    }

    #[test]
    fn test_integer_samples() {
        let adc: Vec<u16> = vec![512, 600, 700, 650];
        let waveform = Waveform::from_samples(&adc, 50.0, 0.0).unwrap();

        assert_eq!(waveform.samples(), &[512.0, 600.0, 700.0, 650.0]);
    }

    #[test]
    fn test_invalid_waveforms() {
        assert!(Waveform::new(vec![], 30.0, 0.0).is_err());
        assert!(Waveform::new(vec![0.0, f64::NAN], 30.0, 0.0).is_err());
        assert!(matches!(
            Waveform::new(vec![0.0; 4], 0.0, 0.0),
            Err(SqiError::InvalidSamplingRate { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let waveform: Waveform =
            serde_json::from_str(r#"{ "samples": [0.0, 1.0], "fps": 50.0 }"#).unwrap();
        assert_eq!(waveform.lpad(), 0.0);

        assert!(serde_json::from_str::<Waveform>(r#"{ "samples": [], "fps": 50.0 }"#).is_err());
        assert!(serde_json::from_str::<Waveform>(r#"{ "samples": [1.0], "fps": 0.0 }"#).is_err());
    }
}
