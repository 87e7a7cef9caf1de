//! Analysis pipeline: filtering, template, scoring and beat quality of one recording

use crate::beat_quality::{BeatQualityAnalyzer, BeatQualityReport};
use crate::config::QualityConfig;
use crate::metrics::{total_elapsed_us, Stage, StageMetrics};
use crate::outliers::{FilteredSlices, OutlierFilterPipeline};
use crate::scoring::{scorer_for, slice_moments, ElasticScorer};
use crate::template::{Template, TemplateBuilder};
use serde::{Deserialize, Serialize};
use sqi_core::{BeatTrain, QualityScores, SqiError, SqiMethod, SqiResult};
use tracing::{debug, info, info_span};
use uuid::Uuid;

/// Template-based signal quality analysis of one recording
#[derive(Debug, Clone)]
pub struct QsqiAnalysis {
    train: BeatTrain,
    config: QualityConfig,
    filtered: Option<FilteredSlices>,
    template: Option<Template>,
    metrics: Vec<StageMetrics>,
}

/// Serializable result of a complete analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub recording: Uuid,
    pub beat_count: usize,
    pub template: Template,
    /// One score vector per method, in `SqiMethod::ALL` order
    pub scores: Vec<QualityScores>,
    pub kurtosis: Vec<f64>,
    pub skewness: Vec<f64>,
    pub spearman: Vec<f64>,
    pub kept_beats: Vec<usize>,
    pub beat_quality: BeatQualityReport,
    pub metrics: Vec<StageMetrics>,
    pub total_elapsed_us: u64,
}

impl QualityReport {
    pub fn scores_for(&self, method: SqiMethod) -> Option<&QualityScores> {
        self.scores.iter().find(|s| s.method == method)
    }

    pub fn outlier_mask(&self) -> &[bool] {
        &self.beat_quality.outlier_mask
    }
}

impl QsqiAnalysis {
    /// Validate the configuration and build the template immediately
    pub fn new(train: BeatTrain, config: QualityConfig) -> SqiResult<Self> {
        let mut analysis = Self::without_template(train, config)?;
        analysis.build_template()?;
        Ok(analysis)
    }

    /// Defer template construction to [`QsqiAnalysis::build_template`]
    pub fn without_template(train: BeatTrain, config: QualityConfig) -> SqiResult<Self> {
        config.validate()?;
        Ok(Self {
            train,
            config,
            filtered: None,
            template: None,
            metrics: Vec::new(),
        })
    }

    /// Filter the fixed-window slices and build the two-pass template
    pub fn build_template(&mut self) -> SqiResult<&Template> {
        let span = info_span!("build_template", recording = %self.train.id);
        let _guard = span.enter();

        let pipeline = OutlierFilterPipeline::new(self.config.clone());
        let filtered = pipeline.run(&self.train)?;
        for m in &filtered.metrics {
            self.record(m.clone());
        }

        let timer = StageMetrics::start(Stage::Template, filtered.slices.len());
        let builder = TemplateBuilder::new(
            self.config.template.clone(),
            self.config.slicing.fixed_lead_fraction,
        );
        let template = match builder.build(&filtered, self.train.interval_count()) {
            Ok(template) => template,
            Err(e) => {
                self.record(timer.finish_with_error(&e.to_string()));
                return Err(e);
            }
        };
        self.record(timer.finish(template.contributing_beats.len()));

        debug!(
            len = template.len(),
            kurtosis = template.kurtosis,
            skewness = template.skewness,
            "template ready"
        );

        self.filtered = Some(filtered);
        Ok(self.template.insert(template))
    }

    pub fn train(&self) -> &BeatTrain {
        &self.train
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn metrics(&self) -> &[StageMetrics] {
        &self.metrics
    }

    /// Keep one entry per stage, replacing the result of an earlier run
    fn record(&mut self, metrics: StageMetrics) {
        self.metrics.retain(|m| m.stage != metrics.stage);
        self.metrics.push(metrics);
    }

    fn require_template(&self) -> SqiResult<&Template> {
        self.template
            .as_ref()
            .ok_or_else(|| SqiError::precondition("template has not been built"))
    }

    fn require_filtered(&self) -> SqiResult<&FilteredSlices> {
        self.filtered
            .as_ref()
            .ok_or_else(|| SqiError::precondition("template has not been built"))
    }

    /// Quality scores of one method
    pub fn score(&self, method: SqiMethod) -> SqiResult<QualityScores> {
        let template = self.require_template()?;
        scorer_for(method, self.config.elastic.decimation).score(&self.train, template)
    }

    /// Direct matching
    pub fn sqi1(&self) -> SqiResult<QualityScores> {
        self.score(SqiMethod::Direct)
    }

    /// Linear resampling
    pub fn sqi2(&self) -> SqiResult<QualityScores> {
        self.score(SqiMethod::Resampled)
    }

    /// Elastic (DTW) alignment
    pub fn sqi3(&self) -> SqiResult<QualityScores> {
        self.score(SqiMethod::Elastic)
    }

    pub fn kurtosis(&self) -> SqiResult<Vec<f64>> {
        Ok(slice_moments(&self.train, self.require_template()?.lead_fraction)?.0)
    }

    pub fn skewness(&self) -> SqiResult<Vec<f64>> {
        Ok(slice_moments(&self.train, self.require_template()?.lead_fraction)?.1)
    }

    /// Rank correlation of the elastically aligned beats
    pub fn spearman(&self) -> SqiResult<Vec<f64>> {
        let template = self.require_template()?;
        ElasticScorer::new(self.config.elastic.decimation).spearman(&self.train, template)
    }

    /// Beat intervals that survived outlier filtering, by first beat number
    pub fn kept_beats(&self) -> SqiResult<Vec<usize>> {
        Ok(self.require_filtered()?.kept_beats())
    }

    /// Per interval, true where outlier filtering excluded it
    pub fn interval_mask(&self) -> SqiResult<&[bool]> {
        Ok(&self.require_filtered()?.interval_mask)
    }

    /// Per sample, false over excluded intervals
    pub fn signal_good(&self) -> SqiResult<&[bool]> {
        Ok(&self.require_filtered()?.signal_good)
    }

    /// Geometric outliers gated by the configured quality method
    pub fn beat_quality(&mut self) -> SqiResult<BeatQualityReport> {
        let quality = self.score(self.config.beat_quality.quality_method)?;
        Ok(self.beat_quality_with(&quality))
    }

    fn beat_quality_with(&mut self, quality: &QualityScores) -> BeatQualityReport {
        let timer = StageMetrics::start(Stage::GeometricOutliers, self.train.beat_count());
        let analyzer = BeatQualityAnalyzer::new(self.config.beat_quality.clone());
        let report = analyzer.analyze(&self.train, quality);
        self.record(timer.finish(report.outlier_count()));
        report
    }

    /// Every score, descriptor and mask of the recording
    pub fn report(&mut self) -> SqiResult<QualityReport> {
        let span = info_span!("qsqi_analysis", recording = %self.train.id);
        let _guard = span.enter();

        if self.template.is_none() {
            self.build_template()?;
        }

        let timer = StageMetrics::start(Stage::Scoring, self.train.interval_count());
        let scores = SqiMethod::ALL
            .iter()
            .map(|&method| self.score(method))
            .collect::<SqiResult<Vec<_>>>()?;
        let (kurtosis, skewness) = slice_moments(&self.train, self.require_template()?.lead_fraction)?;
        let spearman = self.spearman()?;
        self.record(timer.finish(scores.iter().map(|s| s.len()).sum()));

        let method = self.config.beat_quality.quality_method;
        let gate = scores
            .iter()
            .find(|s| s.method == method)
            .cloned()
            .ok_or_else(|| SqiError::config(format!("no scores for method {}", method)))?;
        let beat_quality = self.beat_quality_with(&gate);

        let template = self.require_template()?.clone();
        let kept_beats = self.kept_beats()?;

        info!(
            beats = self.train.beat_count(),
            kept = kept_beats.len(),
            outliers = beat_quality.outlier_count(),
            "analysis complete"
        );

        Ok(QualityReport {
            recording: self.train.id,
            beat_count: self.train.beat_count(),
            template,
            scores,
            kurtosis,
            skewness,
            spearman,
            kept_beats,
            beat_quality,
            total_elapsed_us: total_elapsed_us(&self.metrics),
            metrics: self.metrics.clone(),
        })
    }
}

/// Analyze one recording end to end
pub fn analyze(train: BeatTrain, config: QualityConfig) -> SqiResult<QualityReport> {
    QsqiAnalysis::new(train, config)?.report()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_train(beats: usize) -> BeatTrain {
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

    #[test]
    fn test_deferred_template() {
        let mut analysis =
            QsqiAnalysis::without_template(triangle_train(25), QualityConfig::standard()).unwrap();
        assert!(analysis.template().is_none());
        assert!(analysis.sqi1().unwrap_err().is_precondition());
        assert!(analysis.signal_good().is_err());

        let len = analysis.build_template().unwrap().len();
        assert_eq!(len, 120);
        assert_eq!(analysis.sqi1().unwrap().len(), 24);
        assert!(analysis.signal_good().unwrap().iter().all(|&g| g));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = QualityConfig::standard();
        config.elastic.decimation = 0;
        let err = QsqiAnalysis::new(triangle_train(25), config).unwrap_err();
        assert!(matches!(err, SqiError::ConfigurationError { .. }));
    }

    #[test]
    fn test_report_of_regular_train() {
        let train = triangle_train(25);
        let id = train.id;
        let report = analyze(train, QualityConfig::standard()).unwrap();

        assert_eq!(report.recording, id);
        assert_eq!(report.beat_count, 25);
        assert_eq!(report.scores.len(), 3);
        for scores in &report.scores {
            assert_eq!(scores.len(), 24);
            assert!(scores.min().unwrap() >= 0.95, "{}", scores.method);
        }
        assert!(report.outlier_mask().iter().all(|&m| !m));
        assert_eq!(report.kept_beats, (0..24).collect::<Vec<_>>());
        assert_eq!(report.spearman.len(), 24);

        let stages: Vec<Stage> = report.metrics.iter().map(|m| m.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Slicing,
                Stage::IbiFilter,
                Stage::ShapeFilter,
                Stage::Template,
                Stage::Scoring,
                Stage::GeometricOutliers
            ]
        );
        assert!(report.metrics.iter().all(|m| m.success));
    }

    #[test]
    fn test_repeated_report_keeps_one_entry_per_stage() {
        let mut analysis = QsqiAnalysis::new(triangle_train(20), QualityConfig::standard()).unwrap();
        analysis.beat_quality().unwrap();
        let first = analysis.report().unwrap();
        let second = analysis.report().unwrap();

        assert_eq!(first.metrics.len(), 6);
        assert_eq!(second.metrics.len(), 6);
        let stages: Vec<Stage> = second.metrics.iter().map(|m| m.stage).collect();
        assert_eq!(stages.last(), Some(&Stage::GeometricOutliers));
        assert_eq!(second.total_elapsed_us, total_elapsed_us(&second.metrics));
    }

    #[test]
    fn test_report_serializes() {
        let report = analyze(triangle_train(20), QualityConfig::standard()).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: QualityReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.beat_count, report.beat_count);
        assert_eq!(back.kept_beats, report.kept_beats);
    }
}
