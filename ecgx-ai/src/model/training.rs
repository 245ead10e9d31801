//! Compile-time training description attached to a model graph

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Optimizer {
    Adam { learning_rate: f64 },
}

impl fmt::Display for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Optimizer::Adam { learning_rate } => write!(f, "Adam(lr={})", learning_rate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    BinaryCrossEntropy,
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loss::BinaryCrossEntropy => write!(f, "binary_crossentropy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    Auc,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Accuracy => write!(f, "accuracy"),
            Metric::Auc => write!(f, "auc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub optimizer: Optimizer,
    pub loss: Loss,
    pub metrics: Vec<Metric>,
}

impl Default for TrainingConfig {
    /// Adam at 1e-3, binary cross-entropy, accuracy and AUC
    fn default() -> Self {
        Self {
            optimizer: Optimizer::Adam {
                learning_rate: 1e-3,
            },
            loss: Loss::BinaryCrossEntropy,
            metrics: vec![Metric::Accuracy, Metric::Auc],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_training_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.optimizer.to_string(), "Adam(lr=0.001)");
        assert_eq!(config.loss.to_string(), "binary_crossentropy");
        assert_eq!(config.metrics, vec![Metric::Accuracy, Metric::Auc]);
    }
}
