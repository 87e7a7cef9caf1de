//! SQI-Processing: beat signal quality analysis
//!
//! Beat slicing, IBI and shape outlier filtering, two-pass template
//! construction, template similarity scoring (direct, resampled, elastic) and
//! geometric downslope analysis with population outlier detection.

pub mod batch;
pub mod beat_quality;
pub mod config;
pub mod dtw;
pub mod metrics;
pub mod outliers;
pub mod pipeline;
pub mod regression;
pub mod scoring;
pub mod slicing;
pub mod stats;
pub mod template;

pub use batch::{analyze_batch, BatchJob, BatchOutcome, BatchSummary};
pub use beat_quality::{BeatQualityAnalyzer, BeatQualityReport, Downslope};
pub use config::{
    BeatQualityParams, ElasticParams, IbiFilterParams, QualityConfig, QualityProfile,
    ShapeFilterParams, SlicingParams, TemplateParams,
};
pub use metrics::{Stage, StageMetrics, StageTimer};
pub use outliers::{
    remove_ibi_outliers, remove_shape_outliers, FilteredSlices, OutlierFilterPipeline,
};
pub use pipeline::{analyze, QsqiAnalysis, QualityReport};
pub use scoring::{BeatScorer, DirectScorer, ElasticScorer, ResampledScorer};
pub use slicing::{BeatSlice, BeatSlicer, WindowPolicy};
pub use template::{Template, TemplateBuilder};
