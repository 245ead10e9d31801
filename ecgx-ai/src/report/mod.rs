//! Prediction ranking, lead contribution, signal quality and the narrative
//! reasoning report built from them

pub mod contribution;
pub mod prediction;
pub mod quality;
pub mod reasoning;

pub use contribution::{lead_contributions, LeadContribution};
pub use prediction::{Prediction, RankedLabel, ThresholdFlag};
pub use quality::{QualityAssessment, QualityIssue, SignalQuality, SignalQualityScorer};
pub use reasoning::{ReasoningReport, ReasoningReporter};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    /// Total signal energy is zero, so no lead shares exist
    #[error("Division by zero: total signal energy is zero")]
    DivisionByZero,

    #[error("Invalid signal: {0}")]
    InvalidShape(String),

    #[error("Prediction has {found} probabilities, vocabulary has {expected} labels")]
    LabelMismatch { expected: usize, found: usize },

    #[error("Probability {value} at index {index} is outside [0, 1]")]
    InvalidProbability { index: usize, value: f32 },

    #[error("Threshold {0} is outside [0, 1]")]
    InvalidThreshold(f32),
}
