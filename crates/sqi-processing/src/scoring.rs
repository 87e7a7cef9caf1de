//! Template similarity scoring
//!
//! Every scorer yields one value in `[0, 1]` per beat interval, indexed by
//! the interval's first beat. Intervals whose window collapsed score 0.0.

use crate::dtw::dtw_align;
use crate::slicing::{sig_pad, BeatSlice, BeatSlicer, WindowPolicy};
use crate::stats::{clip_unit, cross_corr, kurtosis, skewness, spearman};
use crate::template::Template;
use sqi_core::{BeatTrain, QualityScores, SqiMethod, SqiResult};

/// Common interface of the similarity scorers
pub trait BeatScorer: Send + Sync {
    fn method(&self) -> SqiMethod;

    /// Score every beat interval of `train` against `template`
    fn score(&self, train: &BeatTrain, template: &Template) -> SqiResult<QualityScores>;
}

/// Window policy matching the template's geometry, length-normalized to it
fn normalized_policy(template: &Template) -> WindowPolicy {
    WindowPolicy::Variable {
        lead_fraction: template.lead_fraction,
        target_len: template.len(),
    }
}

fn fixed_policy(template: &Template) -> WindowPolicy {
    WindowPolicy::Fixed {
        lead_fraction: template.lead_fraction,
    }
}

/// Scatter per-slice values back onto the interval grid, 0.0 where no slice exists
fn per_interval<F>(train: &BeatTrain, slices: &[BeatSlice], mut f: F) -> Vec<f64>
where
    F: FnMut(&[f64]) -> f64,
{
    let mut values = vec![0.0; train.interval_count()];
    for s in slices {
        if !s.is_empty() {
            values[s.beat] = f(&s.samples);
        }
    }
    values
}

fn decimate(x: &[f64], factor: usize) -> Vec<f64> {
    x.iter().step_by(factor.max(1)).copied().collect()
}

/// Fixed window correlated directly against the template
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectScorer;

impl BeatScorer for DirectScorer {
    fn method(&self) -> SqiMethod {
        SqiMethod::Direct
    }

    fn score(&self, train: &BeatTrain, template: &Template) -> SqiResult<QualityScores> {
        let slices = BeatSlicer::new(fixed_policy(template)).slice(train.x(), train.ibeats())?;
        let values = per_interval(train, &slices, |s| {
            clip_unit(cross_corr(&sig_pad(s, template.len()), &template.samples))
        });
        Ok(QualityScores::new(SqiMethod::Direct, values))
    }
}

/// Window linearly resampled to the template length, then correlated
#[derive(Debug, Clone, Copy, Default)]
pub struct ResampledScorer;

impl BeatScorer for ResampledScorer {
    fn method(&self) -> SqiMethod {
        SqiMethod::Resampled
    }

    fn score(&self, train: &BeatTrain, template: &Template) -> SqiResult<QualityScores> {
        let slices = BeatSlicer::new(normalized_policy(template)).slice(train.x(), train.ibeats())?;
        let values = per_interval(train, &slices, |s| {
            clip_unit(cross_corr(s, &template.samples))
        });
        Ok(QualityScores::new(SqiMethod::Resampled, values))
    }
}

/// Length-normalized window, decimated and DTW-aligned to the template
#[derive(Debug, Clone, Copy)]
pub struct ElasticScorer {
    decimation: usize,
}

impl ElasticScorer {
    pub fn new(decimation: usize) -> Self {
        Self {
            decimation: decimation.max(1),
        }
    }

    /// Slice and template decimated and warped onto each other
    pub fn align(&self, slice: &[f64], template: &Template) -> (Vec<f64>, Vec<f64>) {
        dtw_align(
            &decimate(slice, self.decimation),
            &decimate(&template.samples, self.decimation),
        )
    }

    /// Spearman rank correlation of every aligned slice/template pair.
    ///
    /// Undefined correlations (constant inputs) count as 0.0.
    pub fn spearman(&self, train: &BeatTrain, template: &Template) -> SqiResult<Vec<f64>> {
        let slices = BeatSlicer::new(normalized_policy(template)).slice(train.x(), train.ibeats())?;
        Ok(per_interval(train, &slices, |s| {
            let (a, b) = self.align(s, template);
            clip_unit(spearman(&a, &b))
        }))
    }
}

impl Default for ElasticScorer {
    fn default() -> Self {
        Self::new(10)
    }
}

impl BeatScorer for ElasticScorer {
    fn method(&self) -> SqiMethod {
        SqiMethod::Elastic
    }

    fn score(&self, train: &BeatTrain, template: &Template) -> SqiResult<QualityScores> {
        let slices = BeatSlicer::new(normalized_policy(template)).slice(train.x(), train.ibeats())?;
        let values = per_interval(train, &slices, |s| {
            let (a, b) = self.align(s, template);
            clip_unit(cross_corr(&a, &b))
        });
        Ok(QualityScores::new(SqiMethod::Elastic, values))
    }
}

/// Scorer for `method`
pub fn scorer_for(method: SqiMethod, decimation: usize) -> Box<dyn BeatScorer> {
    match method {
        SqiMethod::Direct => Box::new(DirectScorer),
        SqiMethod::Resampled => Box::new(ResampledScorer),
        SqiMethod::Elastic => Box::new(ElasticScorer::new(decimation)),
    }
}

/// Excess kurtosis and skewness of every fixed-window slice
pub fn slice_moments(train: &BeatTrain, lead_fraction: f64) -> SqiResult<(Vec<f64>, Vec<f64>)> {
    let slices = BeatSlicer::new(WindowPolicy::Fixed { lead_fraction }).slice(train.x(), train.ibeats())?;
    let kurt = per_interval(train, &slices, kurtosis);
    let skew = per_interval(train, &slices, skewness);
    Ok((kurt, skew))
}
