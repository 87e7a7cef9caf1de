//! BeatTrain: a waveform together with its detected beat onsets

use crate::error::{SqiError, SqiResult};
use crate::waveform::Waveform;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Waveform plus strictly ascending beat onset indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BeatTrainData")]
pub struct BeatTrain {
    /// Unique identifier for this recording
    pub id: Uuid,
    waveform: Waveform,
    ibeats: Vec<usize>,
}

/// Unvalidated wire form of [`BeatTrain`]
#[derive(Deserialize)]
struct BeatTrainData {
    id: Option<Uuid>,
    waveform: Waveform,
    ibeats: Vec<usize>,
}

impl TryFrom<BeatTrainData> for BeatTrain {
    type Error = SqiError;

    fn try_from(data: BeatTrainData) -> SqiResult<Self> {
        let mut train = BeatTrain::new(data.waveform, data.ibeats)?;
        if let Some(id) = data.id {
            train.id = id;
        }
        Ok(train)
    }
}

impl BeatTrain {
    /// Create a beat train, validating the beat index sequence
    pub fn new(waveform: Waveform, ibeats: Vec<usize>) -> SqiResult<Self> {
        Self::validate_ibeats(&ibeats, waveform.len())?;

        Ok(BeatTrain {
            id: Uuid::new_v4(),
            waveform,
            ibeats,
        })
    }

    /// Build from raw series data (the usual hand-off from a beat detector)
    pub fn from_series<T: ToPrimitive>(
        samples: &[T],
        ibeats: Vec<usize>,
        fps: f64,
        lpad: f64,
    ) -> SqiResult<Self> {
        let waveform = Waveform::from_samples(samples, fps, lpad)?;
        Self::new(waveform, ibeats)
    }

    /// Check that beat indices are strictly ascending and inside the waveform
    pub fn validate_ibeats(ibeats: &[usize], len: usize) -> SqiResult<()> {
        if ibeats.len() < 2 {
            return Err(SqiError::precondition(format!(
                "at least 2 beats are required, got {}",
                ibeats.len()
            )));
        }

        if let Some(i) = ibeats.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SqiError::precondition(format!(
                "ibeats must be strictly ascending: ibeats[{}]={} >= ibeats[{}]={}",
                i,
                ibeats[i],
                i + 1,
                ibeats[i + 1]
            )));
        }

        let last = ibeats[ibeats.len() - 1];
        if last >= len {
            return Err(SqiError::precondition(format!(
                "beat index {} beyond waveform of {} samples",
                last, len
            )));
        }

        Ok(())
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    /// Waveform samples
    pub fn x(&self) -> &[f64] {
        self.waveform.samples()
    }

    /// Sampling rate in Hz
    pub fn fps(&self) -> f64 {
        self.waveform.fps()
    }

    pub fn ibeats(&self) -> &[usize] {
        &self.ibeats
    }

    /// Number of detected beats
    pub fn beat_count(&self) -> usize {
        self.ibeats.len()
    }

    /// Number of beat-to-beat intervals (one per beat with a successor)
    pub fn interval_count(&self) -> usize {
        self.ibeats.len() - 1
    }

    /// Sample bounds `(start, end)` of interval `i`
    pub fn interval(&self, i: usize) -> Option<(usize, usize)> {
        if i + 1 < self.ibeats.len() {
            Some((self.ibeats[i], self.ibeats[i + 1]))
        } else {
            None
        }
    }

    /// Beat onset times in seconds
    pub fn tbeats(&self) -> Vec<f64> {
        self.ibeats.iter().map(|&i| self.waveform.time_at(i)).collect()
    }

    /// Mean beat-to-beat interval in seconds
    pub fn mean_ibi(&self) -> f64 {
        let tbeats = self.tbeats();
        let total: f64 = tbeats.windows(2).map(|w| w[1] - w[0]).sum();
        total / (tbeats.len() - 1) as f64
    }

    /// Median beat-to-beat interval in seconds
    pub fn median_ibi(&self) -> f64 {
        let tbeats = self.tbeats();
        let mut ibis: Vec<f64> = tbeats.windows(2).map(|w| w[1] - w[0]).collect();
        ibis.sort_by(|a, b| a.total_cmp(b));

        let n = ibis.len();
        if n % 2 == 1 {
            ibis[n / 2]
        } else {
            0.5 * (ibis[n / 2 - 1] + ibis[n / 2])
        }
    }
}
