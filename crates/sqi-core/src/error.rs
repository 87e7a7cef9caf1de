//! Error handling for beat quality analysis
//!
//! Separates fatal input problems (preconditions, malformed waveforms) from
//! population-level failures that leave too few beats to build a template.
//! The latter are recoverable at the caller: skip or flag the recording.

use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for signal quality operations
pub type SqiResult<T> = Result<T, SqiError>;

/// Analysis stage that ran out of usable beats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisStage {
    /// Inter-beat-interval length filter
    IbiFilter,
    /// Beat shape envelope filter
    ShapeFilter,
    /// Correlation-based second template pass
    TemplateRefinement,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisStage::IbiFilter => write!(f, "IBI length filter"),
            AnalysisStage::ShapeFilter => write!(f, "shape envelope filter"),
            AnalysisStage::TemplateRefinement => write!(f, "template refinement"),
        }
    }
}

/// Error type for all signal quality operations
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SqiError {
    /// Input violates a structural precondition (e.g. beat indices not ascending)
    #[error("Precondition violated: {reason}")]
    PreconditionViolation {
        /// Description of the violated precondition
        reason: String,
    },

    /// Too few beats survive filtering to build a trustworthy template
    #[error("Insufficient quality basis in {stage}: {reason}")]
    InsufficientQualityBasis {
        /// Stage at which the population became unusable
        stage: AnalysisStage,
        /// Description of the shortfall
        reason: String,
    },

    /// Waveform samples are unusable
    #[error("Invalid waveform: {reason}")]
    InvalidWaveform {
        /// Description of the waveform problem
        reason: String,
    },

    /// Sample rate outside the supported range
    #[error("Invalid sampling rate: {rate}Hz, valid range: {valid_range}")]
    InvalidSamplingRate {
        /// Provided sampling rate
        rate: f64,
        /// Valid range description
        valid_range: String,
    },

    /// Invalid analysis configuration
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem
        message: String,
    },

    /// Synthetic signal generation failed
    #[error("Simulation error: {message}")]
    SimulationError {
        /// Description of the simulation problem
        message: String,
    },

    /// A batch worker did not complete
    #[error("Batch task for '{recording}' failed: {message}")]
    BatchTaskFailed {
        /// Recording the task was analyzing
        recording: String,
        /// Join or panic message
        message: String,
    },
}

impl SqiError {
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            reason: reason.into(),
        }
    }

    pub fn insufficient(stage: AnalysisStage, reason: impl Into<String>) -> Self {
        Self::InsufficientQualityBasis {
            stage,
            reason: reason.into(),
        }
    }

    pub fn invalid_waveform(reason: impl Into<String>) -> Self {
        Self::InvalidWaveform {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// True for the recoverable "not enough good beats" failure
    pub fn is_insufficient_basis(&self) -> bool {
        matches!(self, SqiError::InsufficientQualityBasis { .. })
    }

    /// True for fatal input precondition failures
    pub fn is_precondition(&self) -> bool {
        matches!(self, SqiError::PreconditionViolation { .. })
    }
}
