//! Two-pass beat template construction

use crate::config::TemplateParams;
use crate::outliers::FilteredSlices;
use crate::stats::{column_mean, cross_corr, kurtosis, skewness};
use serde::{Deserialize, Serialize};
use sqi_core::{AnalysisStage, SqiError, SqiResult};
use tracing::debug;

/// Canonical beat shape of one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Final (second-pass) template
    pub samples: Vec<f64>,
    pub kurtosis: f64,
    pub skewness: f64,
    /// Lead fraction of the windows the template was cut with
    pub lead_fraction: f64,
    /// Mean of all filtered slices
    pub first_pass: Vec<f64>,
    /// Correlation of each filtered slice with `first_pass`
    pub first_pass_correlations: Vec<f64>,
    /// Original beat numbers of the slices averaged into `samples`
    pub contributing_beats: Vec<usize>,
}

impl Template {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Builds the template from outlier-filtered fixed-window slices
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    params: TemplateParams,
    lead_fraction: f64,
}

impl TemplateBuilder {
    pub fn new(params: TemplateParams, lead_fraction: f64) -> Self {
        Self {
            params,
            lead_fraction,
        }
    }

    /// Average, re-filter by correlation against the average, average again.
    ///
    /// `interval_count` is the number of detected beat intervals; refinement
    /// fails when fewer than `min_surviving_fraction` of them correlate.
    pub fn build(&self, filtered: &FilteredSlices, interval_count: usize) -> SqiResult<Template> {
        let slices = &filtered.slices;
        if slices.is_empty() {
            return Err(SqiError::insufficient(
                AnalysisStage::TemplateRefinement,
                "no slices survived outlier filtering",
            ));
        }

        let first_pass = column_mean(slices);
        let correlations: Vec<f64> = slices
            .iter()
            .map(|s| cross_corr(&s.samples, &first_pass))
            .collect();

        let good: Vec<&[f64]> = slices
            .iter()
            .zip(&correlations)
            .filter(|(_, &c)| c > self.params.cc_threshold)
            .map(|(s, _)| s.samples.as_slice())
            .collect();

        let required = self.params.min_surviving_fraction * interval_count as f64;
        if (good.len() as f64) < required || good.len() < self.params.min_kept_beats {
            return Err(SqiError::insufficient(
                AnalysisStage::TemplateRefinement,
                format!(
                    "template 2 would keep only {} good beats of {} detected",
                    good.len(),
                    interval_count
                ),
            ));
        }

        let samples = column_mean(&good);
        if samples.is_empty() {
            return Err(SqiError::insufficient(
                AnalysisStage::TemplateRefinement,
                "template length is zero",
            ));
        }

        let contributing_beats = slices
            .iter()
            .zip(&correlations)
            .filter(|(_, &c)| c > self.params.cc_threshold)
            .map(|(s, _)| s.beat)
            .collect();

        debug!(
            len = samples.len(),
            contributing = good.len(),
            "template built"
        );

        Ok(Template {
            kurtosis: kurtosis(&samples),
            skewness: skewness(&samples),
            samples,
            lead_fraction: self.lead_fraction,
            first_pass,
            first_pass_correlations: correlations,
            contributing_beats,
        })
    }
}
