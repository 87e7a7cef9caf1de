//! Beat slicing: cut per-interval windows out of a waveform
//!
//! Each consecutive beat pair `(ibeats[i], ibeats[i+1])` yields one window
//! that starts a fraction of the interval before the onset, so the window
//! captures the transition into the beat. Window starts are fractional and
//! sampled by linear interpolation.

use serde::{Deserialize, Serialize};
use sqi_core::{SqiError, SqiResult};

/// Window cut for one beat interval
#[derive(Debug, Clone, PartialEq)]
pub struct BeatSlice {
    /// Index of the interval's first beat in the original `ibeats`
    pub beat: usize,
    pub samples: Vec<f64>,
}

impl BeatSlice {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl AsRef<[f64]> for BeatSlice {
    fn as_ref(&self) -> &[f64] {
        &self.samples
    }
}

/// Windowing policies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindowPolicy {
    /// `[b - lead * L, b_next)` at native resolution; lengths vary with the IBI
    Fixed { lead_fraction: f64 },
    /// `[b - lead * L, b_next)` linearly resampled to `target_len` samples
    Variable { lead_fraction: f64, target_len: usize },
}

impl WindowPolicy {
    pub fn fixed() -> Self {
        WindowPolicy::Fixed { lead_fraction: 0.2 }
    }

    /// Half-interval lead, 30 samples
    pub fn variable() -> Self {
        WindowPolicy::Variable {
            lead_fraction: 0.5,
            target_len: 30,
        }
    }

    pub fn lead_fraction(&self) -> f64 {
        match *self {
            WindowPolicy::Fixed { lead_fraction } => lead_fraction,
            WindowPolicy::Variable { lead_fraction, .. } => lead_fraction,
        }
    }
}

/// Linear interpolation of `(xp, fp)` at `xq`, clamping outside the grid.
/// `xp` must be ascending and non-empty.
pub fn interp(xq: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if xq <= xp[0] {
        return fp[0];
    }
    if xq >= xp[n - 1] {
        return fp[n - 1];
    }
    // first grid point strictly above xq
    let hi = xp[..n].partition_point(|&v| v <= xq);
    let lo = hi - 1;
    let w = (xq - xp[lo]) / (xp[hi] - xp[lo]);
    fp[lo] + w * (fp[hi] - fp[lo])
}

/// Sample `x` on `[s, e)` with `floor(e - s)` evenly spaced points.
///
/// The integer grid used for interpolation is `floor(s)..floor(e)`; points
/// past its last sample take the edge value.
pub fn sig_slice(x: &[f64], s: f64, e: f64) -> Vec<f64> {
    let n = (e - s).max(0.0) as usize;
    let (is, ie) = (s.max(0.0) as usize, (e.max(0.0) as usize).min(x.len()));
    if n == 0 || is >= ie {
        return Vec::new();
    }

    let grid: Vec<f64> = (is..ie).map(|i| i as f64).collect();
    let values = &x[is..ie];
    let step = (e - s) / n as f64;

    (0..n)
        .map(|k| interp(s + k as f64 * step, &grid, values))
        .collect()
}

/// Linearly resample `sig` to exactly `len` samples
pub fn sig_resample(sig: &[f64], len: usize) -> Vec<f64> {
    if sig.is_empty() || len == 0 {
        return Vec::new();
    }
    let grid: Vec<f64> = (0..sig.len()).map(|i| i as f64).collect();
    let step = sig.len() as f64 / len as f64;

    (0..len)
        .map(|k| interp(k as f64 * step, &grid, sig))
        .collect()
}

/// Pad on the right with the edge value up to `len`, or trim to `len`
pub fn sig_pad(sig: &[f64], len: usize) -> Vec<f64> {
    if sig.len() >= len {
        return sig[..len].to_vec();
    }
    let mut out = sig.to_vec();
    if let Some(&edge) = sig.last() {
        out.resize(len, edge);
    }
    out
}

/// Cuts beat-indexed windows out of a waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatSlicer {
    policy: WindowPolicy,
}

impl BeatSlicer {
    pub fn new(policy: WindowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    /// One window per consecutive beat pair.
    ///
    /// Windows that collapse after clamping to the waveform are dropped; the
    /// `beat` field of each slice keeps the mapping to `ibeats`.
    pub fn slice(&self, x: &[f64], ibeats: &[usize]) -> SqiResult<Vec<BeatSlice>> {
        let lead = self.policy.lead_fraction();
        let mut slices = Vec::with_capacity(ibeats.len().saturating_sub(1));

        for (i, pair) in ibeats.windows(2).enumerate() {
            let (b, next) = (pair[0], pair[1]);
            if next <= b {
                return Err(SqiError::precondition(format!(
                    "ibeats must be strictly ascending: interval {} has length {}",
                    i,
                    next as i64 - b as i64
                )));
            }
            let l = (next - b) as f64;

            let s = (b as f64 - lead * l).max(0.0);
            let e = (next as f64).min(x.len() as f64).max(0.0);
            if s >= e {
                continue;
            }

            let raw = sig_slice(x, s, e);
            let samples = match self.policy {
                WindowPolicy::Fixed { .. } => raw,
                WindowPolicy::Variable { target_len, .. } => sig_resample(&raw, target_len),
            };

            slices.push(BeatSlice { beat: i, samples });
        }

        Ok(slices)
    }
}
