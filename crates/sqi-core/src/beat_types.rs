//! Per-beat result types: scores, geometric descriptors and outlier reasons

use serde::{Deserialize, Serialize};

/// Template similarity scoring strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqiMethod {
    /// Fixed window correlated directly against the template
    Direct,
    /// Length-normalized window linearly resampled to the template length
    Resampled,
    /// Length-normalized window elastically aligned (DTW) to the template
    Elastic,
}

impl SqiMethod {
    pub const ALL: [SqiMethod; 3] = [SqiMethod::Direct, SqiMethod::Resampled, SqiMethod::Elastic];

    pub fn name(&self) -> &'static str {
        match self {
            SqiMethod::Direct => "direct",
            SqiMethod::Resampled => "resampled",
            SqiMethod::Elastic => "elastic",
        }
    }
}

impl std::fmt::Display for SqiMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SqiMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" | "sqi1" => Ok(SqiMethod::Direct),
            "resampled" | "sqi2" => Ok(SqiMethod::Resampled),
            "elastic" | "dtw" | "sqi3" => Ok(SqiMethod::Elastic),
            other => Err(format!("unknown SQI method '{}'", other)),
        }
    }
}

/// One score in `[0, 1]` per beat interval, indexed by the interval's first beat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub method: SqiMethod,
    pub values: Vec<f64>,
}

impl QualityScores {
    pub fn new(method: SqiMethod, values: Vec<f64>) -> Self {
        Self { method, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Score of the interval starting at `beat`, if it has one
    pub fn get(&self, beat: usize) -> Option<f64> {
        self.values.get(beat).copied()
    }

    /// Beats whose score falls below `threshold`
    pub fn below(&self, threshold: f64) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v < threshold)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().min_by(|a, b| a.total_cmp(b))
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        }
    }
}

/// The four geometric downslope descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorKind {
    /// Downslope length weighted by the fraction of points close to the fitted line
    OkSlopeLength,
    /// Arctangent of the fitted downslope slope
    OkSlopeAngle,
    /// Perpendicular distance of the onset to the fitted downslope
    DownslopeOrthogonalDistance,
    /// Distance of the onset from the peak along the slope
    DownslopePeakDistance,
}

impl DescriptorKind {
    pub const ALL: [DescriptorKind; 4] = [
        DescriptorKind::OkSlopeLength,
        DescriptorKind::OkSlopeAngle,
        DescriptorKind::DownslopeOrthogonalDistance,
        DescriptorKind::DownslopePeakDistance,
    ];
}

impl std::fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorKind::OkSlopeLength => write!(f, "ok_slope_length"),
            DescriptorKind::OkSlopeAngle => write!(f, "ok_slope_angle"),
            DescriptorKind::DownslopeOrthogonalDistance => write!(f, "downslope_orthogonal_distance"),
            DescriptorKind::DownslopePeakDistance => write!(f, "downslope_peak_distance"),
        }
    }
}

/// Geometric characterization of one beat's downslope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatDescriptor {
    pub ok_slope_length: f64,
    pub ok_slope_angle: f64,
    pub downslope_orthogonal_distance: f64,
    pub downslope_peak_distance: f64,
    /// Downslope is not linear enough to trust the descriptors at all
    pub is_crap: bool,
}

impl BeatDescriptor {
    /// Descriptor for a beat whose downslope could not be located or fitted
    pub fn degenerate() -> Self {
        Self {
            ok_slope_length: 0.0,
            ok_slope_angle: 0.0,
            downslope_orthogonal_distance: 0.0,
            downslope_peak_distance: 0.0,
            is_crap: true,
        }
    }

    pub fn value(&self, kind: DescriptorKind) -> f64 {
        match kind {
            DescriptorKind::OkSlopeLength => self.ok_slope_length,
            DescriptorKind::OkSlopeAngle => self.ok_slope_angle,
            DescriptorKind::DownslopeOrthogonalDistance => self.downslope_orthogonal_distance,
            DescriptorKind::DownslopePeakDistance => self.downslope_peak_distance,
        }
    }

    pub fn values(&self) -> [f64; 4] {
        DescriptorKind::ALL.map(|kind| self.value(kind))
    }
}

/// Why a beat ended up in the outlier mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutlierReason {
    /// Downslope failed the linearity / R² gate
    Crap,
    /// Population MAD score exceeded the threshold on this descriptor
    Descriptor(DescriptorKind),
    /// Template quality score below the minimum
    LowQuality,
}

impl std::fmt::Display for OutlierReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutlierReason::Crap => write!(f, "non-linear downslope"),
            OutlierReason::Descriptor(kind) => write!(f, "{} anomaly", kind),
            OutlierReason::LowQuality => write!(f, "low template quality"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_scores_queries() {
        let scores = QualityScores::new(SqiMethod::Resampled, vec![0.9, 0.2, 1.0, 0.29]);

        assert_eq!(scores.below(0.3), vec![1, 3]);
        assert_eq!(scores.min(), Some(0.2));
        assert_eq!(scores.get(2), Some(1.0));
        assert_eq!(scores.get(4), None);
        assert!((scores.mean().unwrap() - 0.5975).abs() < 1e-12);
    }

    #[test]
    fn test_descriptor_values_order() {
        let d = BeatDescriptor {
            ok_slope_length: 1.0,
            ok_slope_angle: 2.0,
            downslope_orthogonal_distance: 3.0,
            downslope_peak_distance: 4.0,
            is_crap: false,
        };
        assert_eq!(d.values(), [1.0, 2.0, 3.0, 4.0]);
        assert!(BeatDescriptor::degenerate().is_crap);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("sqi2".parse::<SqiMethod>(), Ok(SqiMethod::Resampled));
        assert_eq!("DTW".parse::<SqiMethod>(), Ok(SqiMethod::Elastic));
        assert!("spectral".parse::<SqiMethod>().is_err());
    }

    #[test]
    fn test_reason_display() {
        let reason = OutlierReason::Descriptor(DescriptorKind::OkSlopeAngle);
        assert_eq!(reason.to_string(), "ok_slope_angle anomaly");
    }

    #[test]
    fn test_descriptor_serialization() {
        let json = serde_json::to_string(&OutlierReason::Descriptor(DescriptorKind::OkSlopeLength)).unwrap();
        let back: OutlierReason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OutlierReason::Descriptor(DescriptorKind::OkSlopeLength));
    }
}
