//! Geometric beat quality analysis
//!
//! Quantifies the downslope preceding every beat onset with a robust line
//! fit, derives four placement/shape descriptors per beat and flags beats
//! whose descriptors are anomalous within the recording's own population.
//! The template score of each beat gates the final mask as well.

use crate::config::BeatQualityParams;
use crate::regression::{theil_sen, LinearFit};
use crate::stats::tiny_outlier_detector;
use serde::{Deserialize, Serialize};
use sqi_core::{BeatDescriptor, BeatTrain, DescriptorKind, OutlierReason, QualityScores};
use tracing::{debug, warn};

/// Peak-to-trough downslope around one onset and its line fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Downslope {
    pub peak: usize,
    pub trough: usize,
    pub fit: LinearFit,
    pub r2: f64,
    /// Fraction of span points within the accepted deviation of the fit
    pub fraction_acceptable: f64,
}

/// Descriptors and outlier flags of every beat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatQualityReport {
    pub descriptors: Vec<BeatDescriptor>,
    /// One entry per beat, true = outlier
    pub outlier_mask: Vec<bool>,
    /// Why each beat was flagged; empty for unflagged beats
    pub reasons: Vec<Vec<OutlierReason>>,
}

impl BeatQualityReport {
    pub fn outlier_count(&self) -> usize {
        self.outlier_mask.iter().filter(|&&m| m).count()
    }

    /// Beat numbers in the outlier mask, ascending
    pub fn outlier_beats(&self) -> Vec<usize> {
        self.outlier_mask
            .iter()
            .enumerate()
            .filter(|(_, m)| **m)
            .map(|(i, _)| i)
            .collect()
    }

    fn flag(&mut self, beat: usize, reason: OutlierReason) {
        self.outlier_mask[beat] = true;
        if !self.reasons[beat].contains(&reason) {
            self.reasons[beat].push(reason);
        }
    }
}

/// Downslope geometry analyzer
#[derive(Debug, Clone)]
pub struct BeatQualityAnalyzer {
    params: BeatQualityParams,
}

impl BeatQualityAnalyzer {
    pub fn new(params: BeatQualityParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BeatQualityParams {
        &self.params
    }

    /// Samples searched on either side of an onset
    pub fn downslope_window(&self, train: &BeatTrain) -> usize {
        let w = train.mean_ibi() / self.params.downslope_ibi_divisor * train.fps();
        if w.is_finite() && w > 0.0 {
            w as usize
        } else {
            0
        }
    }

    /// Locate the peak before and the trough after onset `beat`
    pub fn locate_downslope(&self, train: &BeatTrain, beat: usize) -> Option<(usize, usize)> {
        let x = train.x();
        let ibeats = train.ibeats();
        let b = *ibeats.get(beat)?;
        let w = self.downslope_window(train);
        if w == 0 || b == 0 {
            return None;
        }

        let start = b.saturating_sub(w);
        let mut peak = start + last_local_max(&x[start..b]).or_else(|| argmax(&x[start..b]))?;

        // must not reach back into the previous beat
        if beat > 0 && peak <= ibeats[beat - 1] {
            let start = (ibeats[beat - 1] + w).min(b - 1);
            peak = start + argmax(&x[start..b])?;
        }

        let end = (b + w).min(x.len());
        let mut trough = b + argmin(&x[b..end])?;
        if beat + 1 < ibeats.len() && trough >= ibeats[beat + 1] {
            let end = ibeats[beat + 1].saturating_sub(1).max(b);
            trough = b + argmin(&x[b..end])?;
        }

        Some((peak, trough))
    }

    /// Fit the downslope of onset `beat`; `None` when it spans fewer than two samples
    pub fn fit_downslope(&self, train: &BeatTrain, beat: usize) -> Option<Downslope> {
        let (peak, trough) = self.locate_downslope(train, beat)?;
        if trough < peak + 2 {
            return None;
        }

        let x = train.x();
        let waveform = train.waveform();
        let t: Vec<f64> = (peak..trough).map(|i| waveform.time_at(i)).collect();
        let y = &x[peak..trough];

        let fit = theil_sen(&t, y)?;
        let r2 = fit.r2(&t, y);

        let amplitude = (x[peak] - x[trough]).abs();
        let accepted = if amplitude > 0.0 {
            t.iter()
                .zip(y)
                .filter(|(&ti, &yi)| {
                    100.0 / amplitude * fit.orthogonal_distance(ti, yi)
                        < self.params.accepted_deviation_percentage
                })
                .count()
        } else {
            0
        };

        Some(Downslope {
            peak,
            trough,
            fit,
            r2,
            fraction_acceptable: accepted as f64 / (trough - peak) as f64,
        })
    }

    /// Four geometric descriptors of onset `beat`.
    ///
    /// Beats whose downslope cannot be located or fitted come back as
    /// [`BeatDescriptor::degenerate`].
    pub fn quantify_beat(&self, train: &BeatTrain, beat: usize) -> BeatDescriptor {
        let Some(slope) = self.fit_downslope(train, beat) else {
            warn!(beat, "downslope could not be located");
            return BeatDescriptor::degenerate();
        };

        let x = train.x();
        let b = train.ibeats()[beat];
        let (peak, trough) = (slope.peak, slope.trough);
        let span = (trough - peak) as f64;

        let ok_slope_length = slope.fraction_acceptable * span.hypot(x[peak] - x[trough]);
        let ok_slope_angle = slope.fit.slope.atan();

        // zero clean length leaves nothing to normalize against
        let (orthogonal, peak_distance) = if ok_slope_length == 0.0 {
            (0.0, 0.0)
        } else {
            let tb = train.waveform().time_at(b);
            (
                slope.fit.orthogonal_distance(tb, x[b]) / ok_slope_length,
                ((b as f64 - peak as f64).hypot(x[peak] - x[b])) / ok_slope_length,
            )
        };

        let is_crap = slope.r2.abs() < self.params.minimum_r2
            || slope.fraction_acceptable < self.params.minimum_linearity;
        if is_crap {
            warn!(
                beat,
                r2 = slope.r2,
                fraction_acceptable = slope.fraction_acceptable,
                "non-linear downslope"
            );
        }

        BeatDescriptor {
            ok_slope_length,
            ok_slope_angle,
            downslope_orthogonal_distance: orthogonal,
            downslope_peak_distance: peak_distance,
            is_crap,
        }
    }

    /// Crap flags plus per-descriptor MAD outliers over the non-crap population
    pub fn detect_beat_outliers(&self, train: &BeatTrain) -> BeatQualityReport {
        let n = train.beat_count();
        let descriptors: Vec<BeatDescriptor> =
            (0..n).map(|beat| self.quantify_beat(train, beat)).collect();

        let mut report = BeatQualityReport {
            descriptors,
            outlier_mask: vec![false; n],
            reasons: vec![Vec::new(); n],
        };

        // population excludes crap beats; keep the map back to beat numbers
        let population: Vec<usize> = (0..n).filter(|&i| !report.descriptors[i].is_crap).collect();
        for i in 0..n {
            if report.descriptors[i].is_crap {
                report.flag(i, OutlierReason::Crap);
            }
        }

        for kind in DescriptorKind::ALL {
            let values: Vec<f64> = population
                .iter()
                .map(|&i| report.descriptors[i].value(kind))
                .collect();
            let flagged = tiny_outlier_detector(&values, self.params.outlier_threshold);
            if !flagged.is_empty() {
                debug!(descriptor = %kind, count = flagged.len(), "descriptor anomalies detected");
            }
            for k in flagged {
                report.flag(population[k], OutlierReason::Descriptor(kind));
            }
        }

        report
    }

    /// Full geometric analysis gated by the template `quality` scores.
    ///
    /// `quality` has one value per interval; the final beat has none and is
    /// gated by its geometry alone.
    pub fn analyze(&self, train: &BeatTrain, quality: &QualityScores) -> BeatQualityReport {
        let mut report = self.detect_beat_outliers(train);
        let limit = report.outlier_mask.len();

        for beat in quality.below(self.params.min_quality_score) {
            if beat < limit {
                report.flag(beat, OutlierReason::LowQuality);
            }
        }

        debug!(
            outliers = report.outlier_count(),
            beats = limit,
            "beat quality analysis complete"
        );
        report
    }
}

/// Last strict interior local maximum (plateaus count at their left edge)
fn last_local_max(x: &[f64]) -> Option<usize> {
    (1..x.len().saturating_sub(1))
        .rev()
        .find(|&i| x[i] > x[i - 1] && x[i] >= x[i + 1])
}

/// First index of the maximum
fn argmax(x: &[f64]) -> Option<usize> {
    x.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// First index of the minimum
fn argmin(x: &[f64]) -> Option<usize> {
    x.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, bv)) if bv <= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
