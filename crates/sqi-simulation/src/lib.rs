//! SQI-Simulation: synthetic pulse trains
//!
//! Generates PPG/ECG-like beat trains with known onsets for testing and
//! benchmarking the quality analysis, including controlled artifacts.

pub mod pulse_patterns;
pub mod pulse_simulator;

pub use pulse_patterns::*;
pub use pulse_simulator::*;
