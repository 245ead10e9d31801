//! Per-label probabilities and their ranking

use super::ReportError;
use crate::labels::Vocabulary;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThresholdFlag {
    Above,
    Below,
}

impl fmt::Display for ThresholdFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdFlag::Above => write!(f, "Above threshold"),
            ThresholdFlag::Below => write!(f, "Below threshold"),
        }
    }
}

/// A label whose probability reached the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLabel {
    pub code: String,
    pub probability: f32,
}

/// Sigmoid outputs aligned to a vocabulary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    probabilities: Vec<f32>,
}

impl Prediction {
    pub fn new(probabilities: Vec<f32>, vocabulary: &Vocabulary) -> Result<Self, ReportError> {
        if probabilities.len() != vocabulary.len() {
            return Err(ReportError::LabelMismatch {
                expected: vocabulary.len(),
                found: probabilities.len(),
            });
        }
        if let Some((index, &value)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(ReportError::InvalidProbability { index, value });
        }
        Ok(Self { probabilities })
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    /// Labels at or above `threshold`, most probable first
    ///
    /// Equal probabilities keep vocabulary order.
    pub fn ranked(&self, vocabulary: &Vocabulary, threshold: f32) -> Vec<RankedLabel> {
        let mut ranked: Vec<RankedLabel> = self
            .probabilities
            .iter()
            .enumerate()
            .filter(|(_, &p)| p >= threshold)
            .filter_map(|(i, &p)| {
                vocabulary.code(i).map(|code| RankedLabel {
                    code: code.to_string(),
                    probability: p,
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        ranked
    }

    /// Highest probability as a percentage (0 when there are no labels)
    pub fn confidence(&self) -> f64 {
        self.max_probability() as f64 * 100.0
    }

    pub fn threshold_flag(&self, threshold: f32) -> ThresholdFlag {
        if !self.probabilities.is_empty() && self.max_probability() >= threshold {
            ThresholdFlag::Above
        } else {
            ThresholdFlag::Below
        }
    }

    fn max_probability(&self) -> f32 {
        self.probabilities.iter().copied().fold(0.0, f32::max)
    }
}
