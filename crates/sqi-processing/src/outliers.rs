//! Slice outlier filtering ahead of template construction
//!
//! Stage A rejects slices whose length (a proxy for the IBI) falls outside a
//! percentile model and brings the survivors to one common length. Stage B
//! builds per-sample amplitude envelopes and drops slices that leave them too
//! often. Every slice keeps its originating beat number, so the surviving set
//! maps back onto `ibeats` without further bookkeeping.

use crate::config::{IbiFilterParams, QualityConfig, ShapeFilterParams};
use crate::metrics::{Stage, StageMetrics};
use crate::slicing::{sig_pad, BeatSlice, BeatSlicer};
use crate::stats::{column_percentile, median, percentile};
use sqi_core::{AnalysisStage, BeatTrain, SqiError, SqiResult};
use tracing::debug;

/// Result of the IBI length filter
#[derive(Debug, Clone)]
pub struct IbiFilterOutcome {
    /// Surviving slices padded or trimmed to `common_len`
    pub slices: Vec<BeatSlice>,
    pub common_len: usize,
    pub model_len_min: f64,
    pub model_len_max: f64,
}

/// Result of the shape envelope filter
#[derive(Debug, Clone)]
pub struct ShapeFilterOutcome {
    pub slices: Vec<BeatSlice>,
    pub lower_envelope: Vec<f64>,
    pub upper_envelope: Vec<f64>,
    /// Envelope violations of every input slice, in input order
    pub violations: Vec<usize>,
    pub violation_threshold: f64,
}

/// Stage A: IBI length filter.
///
/// Fails when the length population itself is too skewed for the model (more
/// than `limit_percentile` of slices beyond the median tolerance band on either
/// side), or when too few slices survive.
pub fn remove_ibi_outliers(
    slices: &[BeatSlice],
    params: &IbiFilterParams,
    min_kept: usize,
) -> SqiResult<IbiFilterOutcome> {
    if slices.is_empty() {
        return Err(SqiError::insufficient(AnalysisStage::IbiFilter, "no slices to filter"));
    }

    let lens: Vec<f64> = slices.iter().map(|s| s.len() as f64).collect();
    let n = lens.len() as f64;
    let r = params.rel_dev_limit;
    let p = params.limit_percentile;

    let med = median(&lens);
    let (len_min, len_max) = (med * (1.0 - r), med * (1.0 + r));
    let below = lens.iter().filter(|&&l| l < len_min).count();
    let above = lens.iter().filter(|&&l| l > len_max).count();
    if below as f64 > p * n {
        return Err(SqiError::insufficient(
            AnalysisStage::IbiFilter,
            format!(
                "IBI model len_min assumption violated: {} of {} slices shorter than {:.1}",
                below, lens.len(), len_min
            ),
        ));
    }
    if above as f64 > p * n {
        return Err(SqiError::insufficient(
            AnalysisStage::IbiFilter,
            format!(
                "IBI model len_max assumption violated: {} of {} slices longer than {:.1}",
                above, lens.len(), len_max
            ),
        ));
    }

    let model_len_max = percentile(&lens, 100.0 * (1.0 - p)) * (1.0 + r);
    let model_len_min = percentile(&lens, 100.0 * p) * (1.0 - r);
    let common_len = percentile(&lens, 100.0 * p) as usize;
    debug!(
        model_len_min,
        model_len_max, common_len, "IBI length model"
    );

    if common_len == 0 {
        return Err(SqiError::insufficient(
            AnalysisStage::IbiFilter,
            "common slice length is zero",
        ));
    }

    let kept: Vec<BeatSlice> = slices
        .iter()
        .filter(|s| {
            let l = s.len() as f64;
            l < model_len_max && l > model_len_min
        })
        .map(|s| BeatSlice {
            beat: s.beat,
            samples: sig_pad(&s.samples, common_len),
        })
        .collect();

    if kept.len() < min_kept {
        return Err(SqiError::insufficient(
            AnalysisStage::IbiFilter,
            format!("only {} of {} slices within IBI limits", kept.len(), slices.len()),
        ));
    }

    Ok(IbiFilterOutcome {
        slices: kept,
        common_len,
        model_len_min,
        model_len_max,
    })
}

/// Stage B: shape envelope filter.
///
/// Input slices must share one length. A slice survives when its violation
/// count does not exceed the violation threshold. At least
/// `floor((n - 1) * (1 - violation_limit_percentile)) + 1` of `n` slices
/// survive every pass.
///
/// The envelopes and threshold are rebuilt from whatever set is passed in, so
/// re-filtering the kept set is only a fixed point when that set has no
/// envelope violations (e.g. exactly repeating beats). Noisy populations lose
/// their top violators again on every pass.
pub fn remove_shape_outliers(
    slices: &[BeatSlice],
    params: &ShapeFilterParams,
    min_kept: usize,
) -> SqiResult<ShapeFilterOutcome> {
    let width = slices.first().map(|s| s.len()).unwrap_or(0);
    if width == 0 {
        return Err(SqiError::insufficient(AnalysisStage::ShapeFilter, "no slices to filter"));
    }
    if slices.iter().any(|s| s.len() != width) {
        return Err(SqiError::precondition(
            "shape filter requires slices of one common length",
        ));
    }

    let p = params.amplitude_limit_percentile;
    let lower_envelope = column_percentile(slices, 100.0 * p);
    let upper_envelope = column_percentile(slices, 100.0 * (1.0 - p));

    let violations: Vec<usize> = slices
        .iter()
        .map(|s| {
            s.samples
                .iter()
                .zip(lower_envelope.iter().zip(&upper_envelope))
                .filter(|(v, (lo, hi))| *v < *lo || *v > *hi)
                .count()
        })
        .collect();

    let counts: Vec<f64> = violations.iter().map(|&c| c as f64).collect();
    let violation_threshold = percentile(&counts, 100.0 * (1.0 - params.violation_limit_percentile));

    let kept: Vec<BeatSlice> = slices
        .iter()
        .zip(&violations)
        .filter(|(_, &c)| c as f64 <= violation_threshold)
        .map(|(s, _)| s.clone())
        .collect();

    debug!(
        violation_threshold,
        kept = kept.len(),
        total = slices.len(),
        "shape envelope filter"
    );

    if kept.len() < min_kept {
        return Err(SqiError::insufficient(
            AnalysisStage::ShapeFilter,
            format!("only {} of {} slices inside the shape envelopes", kept.len(), slices.len()),
        ));
    }

    Ok(ShapeFilterOutcome {
        slices: kept,
        lower_envelope,
        upper_envelope,
        violations,
        violation_threshold,
    })
}

/// Slices that survived both filter stages
#[derive(Debug, Clone)]
pub struct FilteredSlices {
    /// Common-length slices, each tagged with its original beat number
    pub slices: Vec<BeatSlice>,
    pub common_len: usize,
    /// Per beat interval, true = excluded by either stage
    pub interval_mask: Vec<bool>,
    /// Per waveform sample, false where the covering interval was excluded
    pub signal_good: Vec<bool>,
    pub ibi: IbiFilterOutcome,
    pub lower_envelope: Vec<f64>,
    pub upper_envelope: Vec<f64>,
    pub metrics: Vec<StageMetrics>,
}

impl FilteredSlices {
    /// Original beat numbers of the kept intervals, ascending
    pub fn kept_beats(&self) -> Vec<usize> {
        self.slices.iter().map(|s| s.beat).collect()
    }
}

/// Sequential IBI and shape filtering of fixed-window slices
#[derive(Debug, Clone)]
pub struct OutlierFilterPipeline {
    config: QualityConfig,
}

impl OutlierFilterPipeline {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Slice `train` with fixed windows and run both stages
    pub fn run(&self, train: &BeatTrain) -> SqiResult<FilteredSlices> {
        let mut metrics = Vec::with_capacity(3);

        let timer = StageMetrics::start(Stage::Slicing, train.interval_count());
        let slicer = BeatSlicer::new(self.config.slicing.fixed_policy());
        let raw = match slicer.slice(train.x(), train.ibeats()) {
            Ok(raw) => raw,
            Err(e) => {
                metrics.push(timer.finish_with_error(&e.to_string()));
                return Err(e);
            }
        };
        metrics.push(timer.finish(raw.len()));

        self.filter(raw, train, metrics)
    }

    /// Run both stages on already cut slices
    pub fn filter(
        &self,
        raw: Vec<BeatSlice>,
        train: &BeatTrain,
        mut metrics: Vec<StageMetrics>,
    ) -> SqiResult<FilteredSlices> {
        let min_kept = self.config.template.min_kept_beats;

        let timer = StageMetrics::start(Stage::IbiFilter, raw.len());
        let ibi = match remove_ibi_outliers(&raw, &self.config.ibi_filter, min_kept) {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics.push(timer.finish_with_error(&e.to_string()));
                return Err(e);
            }
        };
        metrics.push(timer.finish(ibi.slices.len()));

        let timer = StageMetrics::start(Stage::ShapeFilter, ibi.slices.len());
        let shape = match remove_shape_outliers(&ibi.slices, &self.config.shape_filter, min_kept) {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics.push(timer.finish_with_error(&e.to_string()));
                return Err(e);
            }
        };
        metrics.push(timer.finish(shape.slices.len()));

        let mut interval_mask = vec![true; train.interval_count()];
        for s in &shape.slices {
            interval_mask[s.beat] = false;
        }
        let signal_good = scrub_mask(train, &interval_mask);

        debug!(
            kept = shape.slices.len(),
            intervals = train.interval_count(),
            common_len = ibi.common_len,
            "outlier filtering complete"
        );

        Ok(FilteredSlices {
            slices: shape.slices,
            common_len: ibi.common_len,
            interval_mask,
            signal_good,
            ibi,
            lower_envelope: shape.lower_envelope,
            upper_envelope: shape.upper_envelope,
            metrics,
        })
    }
}

/// Sample-aligned mask, false over every excluded interval `[ibeats[i], ibeats[i+1])`
pub fn scrub_mask(train: &BeatTrain, interval_mask: &[bool]) -> Vec<bool> {
    let len = train.x().len();
    let mut good = vec![true; len];
    for (i, &excluded) in interval_mask.iter().enumerate() {
        if !excluded {
            continue;
        }
        if let Some((s, e)) = train.interval(i) {
            let (s, e) = (s.min(len), e.min(len));
            good[s..e].iter_mut().for_each(|g| *g = false);
        }
    }
    good
}
