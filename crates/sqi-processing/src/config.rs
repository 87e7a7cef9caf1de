//! Configuration management for beat quality analysis

use crate::slicing::WindowPolicy;
use serde::{Deserialize, Serialize};
use sqi_core::{SqiError, SqiMethod, SqiResult};

/// Complete analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Configuration name/profile
    pub name: String,
    pub profile: QualityProfile,
    pub slicing: SlicingParams,
    pub ibi_filter: IbiFilterParams,
    pub shape_filter: ShapeFilterParams,
    pub template: TemplateParams,
    pub elastic: ElasticParams,
    pub beat_quality: BeatQualityParams,
}

/// Threshold profiles for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityProfile {
    /// Published default thresholds
    Standard,
    /// Tighter tolerances for clean laboratory recordings
    Strict,
    /// Wider tolerances for ambulatory or wearable recordings
    Lenient,
    /// Custom profile
    Custom,
}

/// Beat window geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlicingParams {
    /// Fraction of the interval included before the onset in fixed windows
    pub fixed_lead_fraction: f64,
    /// Lead fraction of the standalone variable window policy
    pub variable_lead_fraction: f64,
    /// Sample count of the standalone variable window policy
    pub variable_target_len: usize,
}

/// Stage A: IBI length model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IbiFilterParams {
    /// Relative tolerance around the median / percentile lengths
    pub rel_dev_limit: f64,
    /// Lower percentile (as a fraction) of the length model; the upper one is its complement
    pub limit_percentile: f64,
}

/// Stage B: amplitude envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeFilterParams {
    /// Lower envelope percentile (as a fraction); the upper one is its complement
    pub amplitude_limit_percentile: f64,
    /// Violation-count threshold is taken at the complement of this percentile
    pub violation_limit_percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParams {
    /// Minimum correlation with the first-pass template to contribute to the final one
    pub cc_threshold: f64,
    /// Minimum fraction of beat intervals that must survive refinement
    pub min_surviving_fraction: f64,
    /// Absolute minimum of slices at every filter stage
    pub min_kept_beats: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticParams {
    /// Keep every n-th sample before alignment
    pub decimation: usize,
}

/// Geometric downslope analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatQualityParams {
    /// Maximum orthogonal deviation from the fitted downslope, in percent of the amplitude
    pub accepted_deviation_percentage: f64,
    pub minimum_linearity: f64,
    pub minimum_r2: f64,
    /// Modified z-score above which a descriptor value is anomalous
    pub outlier_threshold: f64,
    /// Downslope search window is the mean IBI divided by this
    pub downslope_ibi_divisor: f64,
    /// Template scores below this mark the beat as an outlier
    pub min_quality_score: f64,
    /// Scorer whose output gates the final mask
    pub quality_method: SqiMethod,
}

impl Default for SlicingParams {
    fn default() -> Self {
        Self {
            fixed_lead_fraction: 0.2,
            variable_lead_fraction: 0.5,
            variable_target_len: 30,
        }
    }
}

impl Default for IbiFilterParams {
    fn default() -> Self {
        Self {
            rel_dev_limit: 0.38,
            limit_percentile: 0.1,
        }
    }
}

impl Default for ShapeFilterParams {
    fn default() -> Self {
        Self {
            amplitude_limit_percentile: 0.1,
            violation_limit_percentile: 0.1,
        }
    }
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            cc_threshold: 0.8,
            min_surviving_fraction: 0.3,
            min_kept_beats: 3,
        }
    }
}

impl Default for ElasticParams {
    fn default() -> Self {
        Self { decimation: 10 }
    }
}

impl Default for BeatQualityParams {
    fn default() -> Self {
        Self {
            accepted_deviation_percentage: 10.0,
            minimum_linearity: 0.75,
            minimum_r2: 0.75,
            outlier_threshold: 7.0,
            downslope_ibi_divisor: 2.5,
            min_quality_score: 0.3,
            quality_method: SqiMethod::Resampled,
        }
    }
}

impl SlicingParams {
    pub fn fixed_policy(&self) -> WindowPolicy {
        WindowPolicy::Fixed {
            lead_fraction: self.fixed_lead_fraction,
        }
    }

    pub fn variable_policy(&self) -> WindowPolicy {
        WindowPolicy::Variable {
            lead_fraction: self.variable_lead_fraction,
            target_len: self.variable_target_len,
        }
    }
}

/// Preset configurations
impl QualityConfig {
    pub fn standard() -> Self {
        Self {
            name: "Standard".to_string(),
            profile: QualityProfile::Standard,
            slicing: SlicingParams::default(),
            ibi_filter: IbiFilterParams::default(),
            shape_filter: ShapeFilterParams::default(),
            template: TemplateParams::default(),
            elastic: ElasticParams::default(),
            beat_quality: BeatQualityParams::default(),
        }
    }

    /// Clean laboratory recordings
    pub fn strict() -> Self {
        let mut config = Self::standard();
        config.name = "Strict".to_string();
        config.profile = QualityProfile::Strict;

        config.ibi_filter.rel_dev_limit = 0.25;
        config.template.cc_threshold = 0.9;
        config.template.min_surviving_fraction = 0.5;
        config.beat_quality.accepted_deviation_percentage = 7.5;
        config.beat_quality.minimum_linearity = 0.85;
        config.beat_quality.minimum_r2 = 0.85;
        config.beat_quality.outlier_threshold = 5.0;
        config.beat_quality.min_quality_score = 0.5;

        config
    }

    /// Ambulatory and wearable recordings
    pub fn lenient() -> Self {
        let mut config = Self::standard();
        config.name = "Lenient".to_string();
        config.profile = QualityProfile::Lenient;

        config.ibi_filter.rel_dev_limit = 0.5;
        config.template.cc_threshold = 0.7;
        config.template.min_surviving_fraction = 0.2;
        config.beat_quality.accepted_deviation_percentage = 15.0;
        config.beat_quality.minimum_linearity = 0.6;
        config.beat_quality.minimum_r2 = 0.6;
        config.beat_quality.outlier_threshold = 10.0;
        config.beat_quality.min_quality_score = 0.2;

        config
    }

    pub fn for_profile(profile: QualityProfile) -> Self {
        match profile {
            QualityProfile::Standard => Self::standard(),
            QualityProfile::Strict => Self::strict(),
            QualityProfile::Lenient => Self::lenient(),
            QualityProfile::Custom => {
                let mut config = Self::standard();
                config.name = "Custom".to_string();
                config.profile = QualityProfile::Custom;
                config
            }
        }
    }

    /// Validate every threshold
    pub fn validate(&self) -> SqiResult<()> {
        fn fraction(name: &str, value: f64, lo: f64, hi: f64) -> SqiResult<()> {
            if value.is_finite() && value >= lo && value <= hi {
                Ok(())
            } else {
                Err(SqiError::config(format!(
                    "{} must lie in [{}, {}], got {}",
                    name, lo, hi, value
                )))
            }
        }
        fn positive(name: &str, value: f64) -> SqiResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SqiError::config(format!("{} must be positive, got {}", name, value)))
            }
        }

        fraction("slicing.fixed_lead_fraction", self.slicing.fixed_lead_fraction, 0.0, 1.0)?;
        fraction("slicing.variable_lead_fraction", self.slicing.variable_lead_fraction, 0.0, 1.0)?;
        if self.slicing.variable_target_len < 2 {
            return Err(SqiError::config("slicing.variable_target_len must be at least 2"));
        }

        fraction("ibi_filter.rel_dev_limit", self.ibi_filter.rel_dev_limit, 0.0, 1.0)?;
        fraction("ibi_filter.limit_percentile", self.ibi_filter.limit_percentile, 0.0, 0.5)?;
        fraction(
            "shape_filter.amplitude_limit_percentile",
            self.shape_filter.amplitude_limit_percentile,
            0.0,
            0.5,
        )?;
        fraction(
            "shape_filter.violation_limit_percentile",
            self.shape_filter.violation_limit_percentile,
            0.0,
            1.0,
        )?;

        fraction("template.cc_threshold", self.template.cc_threshold, -1.0, 1.0)?;
        fraction("template.min_surviving_fraction", self.template.min_surviving_fraction, 0.0, 1.0)?;
        if self.template.min_kept_beats == 0 {
            return Err(SqiError::config("template.min_kept_beats must be at least 1"));
        }

        if self.elastic.decimation == 0 {
            return Err(SqiError::config("elastic.decimation must be at least 1"));
        }

        let bq = &self.beat_quality;
        positive("beat_quality.accepted_deviation_percentage", bq.accepted_deviation_percentage)?;
        fraction("beat_quality.minimum_linearity", bq.minimum_linearity, 0.0, 1.0)?;
        fraction("beat_quality.minimum_r2", bq.minimum_r2, 0.0, 1.0)?;
        positive("beat_quality.outlier_threshold", bq.outlier_threshold)?;
        positive("beat_quality.downslope_ibi_divisor", bq.downslope_ibi_divisor)?;
        fraction("beat_quality.min_quality_score", bq.min_quality_score, 0.0, 1.0)?;

        Ok(())
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> SqiResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SqiError::config(format!("JSON serialization failed: {}", e)))
    }

    /// Deserialize and validate configuration from JSON
    pub fn from_json(json: &str) -> SqiResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SqiError::config(format!("JSON deserialization failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::str::FromStr for QualityProfile {
    type Err = SqiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(QualityProfile::Standard),
            "strict" => Ok(QualityProfile::Strict),
            "lenient" => Ok(QualityProfile::Lenient),
            "custom" => Ok(QualityProfile::Custom),
            other => Err(SqiError::config(format!("unknown profile '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_config() {
        let config = QualityConfig::standard();
        assert_eq!(config.profile, QualityProfile::Standard);
        assert_eq!(config.template.cc_threshold, 0.8);
        assert_eq!(config.beat_quality.outlier_threshold, 7.0);
        assert_eq!(config.elastic.decimation, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profile_creation() {
        for profile in [
            QualityProfile::Standard,
            QualityProfile::Strict,
            QualityProfile::Lenient,
            QualityProfile::Custom,
        ] {
            let config = QualityConfig::for_profile(profile);
            assert_eq!(config.profile, profile);
            assert!(config.validate().is_ok());
        }

        let strict = QualityConfig::strict();
        let lenient = QualityConfig::lenient();
        assert!(strict.template.cc_threshold > lenient.template.cc_threshold);
        assert!(strict.beat_quality.outlier_threshold < lenient.beat_quality.outlier_threshold);
    }

    #[test]
    fn test_config_validation() {
        let mut config = QualityConfig::standard();
        config.elastic.decimation = 0;
        assert!(config.validate().is_err());

        let mut config = QualityConfig::standard();
        config.ibi_filter.rel_dev_limit = 1.5;
        assert!(config.validate().is_err());

        let mut config = QualityConfig::standard();
        config.beat_quality.outlier_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_serialization() {
        let config = QualityConfig::lenient();
        let json = config.to_json().unwrap();
        let back = QualityConfig::from_json(&json).unwrap();
        assert_eq!(back, config);

        assert!(QualityConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_window_policies() {
        let slicing = SlicingParams::default();
        assert_eq!(slicing.fixed_policy(), WindowPolicy::fixed());
        assert_eq!(slicing.variable_policy(), WindowPolicy::variable());
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!("Strict".parse::<QualityProfile>().unwrap(), QualityProfile::Strict);
        assert!("fast".parse::<QualityProfile>().is_err());
    }
}
