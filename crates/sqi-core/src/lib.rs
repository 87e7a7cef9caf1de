//! SQI-Core: Foundation types for beat quality analysis
//!
//! Waveforms, beat index sequences and the per-beat result types shared by
//! the processing, simulation and batch crates.

pub mod beat_train;
pub mod beat_types;
pub mod error;
pub mod waveform;

pub use beat_train::*;
pub use beat_types::*;
pub use error::{AnalysisStage, SqiError, SqiResult};
pub use waveform::*;
