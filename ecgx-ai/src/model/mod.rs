//! Classifier architecture description
//!
//! The model is described, not trained: [`ModelArchitectureBuilder`] produces
//! an immutable [`ModelGraph`] whose stages carry inferred output shapes and
//! parameter counts, plus the training configuration the graph is compiled
//! with.

pub mod attention;
pub mod builder;
pub mod graph;
pub mod layer;
pub mod training;

pub use attention::ChannelAttention;
pub use builder::{ArchitectureConfig, ModelArchitectureBuilder};
pub use graph::{ModelGraph, Stage, StageId};
pub use layer::{Activation, LayerSpec, Padding, ParamCount, TensorShape};
pub use training::{Loss, Metric, Optimizer, TrainingConfig};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Shape error at stage '{stage}': {reason}")]
    Shape { stage: String, reason: String },

    #[error("Duplicate stage name: {0}")]
    DuplicateStage(String),

    #[error("Unknown stage id: {0}")]
    UnknownStage(usize),

    #[error("Graph has no input stages")]
    NoInputs,

    #[error("Invalid architecture: {0}")]
    InvalidConfig(String),
}
