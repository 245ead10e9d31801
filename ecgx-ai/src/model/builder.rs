//! Multimodal ECG + clinical classifier architecture
//!
//! Waveform path: Conv1D projection, reshape to a single-channel image,
//! parallel multi-scale Conv2D branches, residual blocks, channel attention and
//! global pooling. Clinical path: Dense + batch normalization. Both paths are
//! concatenated and pass through a dense head with a sigmoid output per label.

use super::graph::{GraphBuilder, ModelGraph, StageId};
use super::layer::{Activation, LayerSpec, Padding, TensorShape};
use super::training::TrainingConfig;
use super::GraphError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const MODEL_NAME: &str = "ecg_multimodal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitectureConfig {
    pub projection_filters: usize,
    pub projection_kernel: usize,
    pub branch_filters: usize,
    pub branch_kernels: Vec<usize>,
    pub residual_blocks: usize,
    pub residual_filters: usize,
    pub residual_kernel: usize,
    /// Squeeze width is channels / reduction
    pub attention_reduction: usize,
    pub clinical_units: usize,
    pub fusion_units: usize,
    pub dropout: f32,
    pub activation: Activation,
    pub training: TrainingConfig,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self {
            projection_filters: 64,
            projection_kernel: 11,
            branch_filters: 32,
            branch_kernels: vec![50, 100, 150],
            residual_blocks: 1,
            residual_filters: 96,
            residual_kernel: 3,
            attention_reduction: 2,
            clinical_units: 64,
            fusion_units: 128,
            dropout: 0.3,
            activation: Activation::Swish,
            training: TrainingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelArchitectureBuilder {
    config: ArchitectureConfig,
}

impl ModelArchitectureBuilder {
    pub fn new(config: ArchitectureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArchitectureConfig {
        &self.config
    }

    /// `waveform_shape` is (time samples, leads); no batch axis
    pub fn build(
        &self,
        waveform_shape: [usize; 2],
        clinical_dim: usize,
        num_classes: usize,
    ) -> Result<ModelGraph, GraphError> {
        let c = &self.config;
        let [samples, leads] = waveform_shape;
        if samples == 0 || leads == 0 {
            return Err(GraphError::InvalidConfig(format!(
                "waveform shape must be non-empty, got ({}, {})",
                samples, leads
            )));
        }
        if clinical_dim == 0 {
            return Err(GraphError::InvalidConfig(
                "clinical input needs at least one attribute".to_string(),
            ));
        }
        if num_classes == 0 {
            return Err(GraphError::InvalidConfig(
                "model needs at least one output label".to_string(),
            ));
        }
        if c.branch_kernels.is_empty() {
            return Err(GraphError::InvalidConfig(
                "at least one convolution branch is required".to_string(),
            ));
        }
        if c.attention_reduction == 0 {
            return Err(GraphError::InvalidConfig(
                "attention reduction must be >= 1".to_string(),
            ));
        }

        let mut g = GraphBuilder::new();
        let ecg = g.input("ecg_input", TensorShape::new(vec![samples, leads]))?;
        let projected = g.add(
            "ecg_projection",
            LayerSpec::Conv1d {
                filters: c.projection_filters,
                kernel: c.projection_kernel,
                stride: 1,
                padding: Padding::Same,
                activation: c.activation,
            },
            &[ecg],
        )?;
        let dims = g.shape(projected)?.dims().to_vec();
        let image = g.add(
            "ecg_reshape",
            LayerSpec::Reshape {
                target: TensorShape::new(vec![dims[0], dims[1], 1]),
            },
            &[projected],
        )?;

        let mut branches = Vec::with_capacity(c.branch_kernels.len());
        for (i, &kernel) in c.branch_kernels.iter().enumerate() {
            branches.push(g.add(
                &format!("branch{}", i + 1),
                LayerSpec::Conv2d {
                    filters: c.branch_filters,
                    kernel: (kernel, 1),
                    stride: (1, 1),
                    padding: Padding::Same,
                    activation: c.activation,
                },
                &[image],
            )?);
        }
        let mut x = if branches.len() == 1 {
            branches[0]
        } else {
            g.add("concat_branches", LayerSpec::Concatenate, &branches)?
        };

        for block in 1..=c.residual_blocks {
            x = self.residual_block(&mut g, &format!("res_block{}", block), x)?;
        }
        x = self.channel_attention(&mut g, "attention", x)?;
        let ecg_features = g.add("ecg_pool", LayerSpec::GlobalAveragePooling, &[x])?;

        let clinical = g.input("clinical_input", TensorShape::new(vec![clinical_dim]))?;
        let clinical = g.add(
            "clinical_dense",
            LayerSpec::Dense {
                units: c.clinical_units,
                activation: Activation::Relu,
            },
            &[clinical],
        )?;
        let clinical = g.add("clinical_bn", LayerSpec::BatchNorm, &[clinical])?;

        let fused = g.add("fusion", LayerSpec::Concatenate, &[ecg_features, clinical])?;
        let fused = g.add(
            "fusion_dense",
            LayerSpec::Dense {
                units: c.fusion_units,
                activation: Activation::Relu,
            },
            &[fused],
        )?;
        let fused = g.add(
            "fusion_dropout",
            LayerSpec::Dropout { rate: c.dropout },
            &[fused],
        )?;
        let output = g.add(
            "diagnosis",
            LayerSpec::Dense {
                units: num_classes,
                activation: Activation::Sigmoid,
            },
            &[fused],
        )?;

        let graph = g.finish(MODEL_NAME, output, c.training.clone())?;
        let params = graph.params();
        info!(
            stages = graph.stages().len(),
            trainable = params.trainable,
            non_trainable = params.non_trainable,
            "Built model graph for input ({}, {}) with {} labels",
            samples,
            leads,
            num_classes
        );
        Ok(graph)
    }

    /// conv → bn → conv → bn, plus a 1×1 projection when widths differ
    fn residual_block(
        &self,
        g: &mut GraphBuilder,
        name: &str,
        input: StageId,
    ) -> Result<StageId, GraphError> {
        let c = &self.config;
        let conv = |filters| LayerSpec::Conv2d {
            filters,
            kernel: (c.residual_kernel, 1),
            stride: (1, 1),
            padding: Padding::Same,
            activation: c.activation,
        };

        let x = g.add(&format!("{}_conv1", name), conv(c.residual_filters), &[input])?;
        let x = g.add(&format!("{}_bn1", name), LayerSpec::BatchNorm, &[x])?;
        let x = g.add(&format!("{}_conv2", name), conv(c.residual_filters), &[x])?;
        let x = g.add(&format!("{}_bn2", name), LayerSpec::BatchNorm, &[x])?;

        let shortcut = if g.shape(input)?.channels() != c.residual_filters {
            debug!(block = name, "Adding shortcut projection");
            g.add(
                &format!("{}_proj", name),
                LayerSpec::Conv2d {
                    filters: c.residual_filters,
                    kernel: (1, 1),
                    stride: (1, 1),
                    padding: Padding::Same,
                    activation: Activation::Linear,
                },
                &[input],
            )?
        } else {
            input
        };
        g.add(&format!("{}_add", name), LayerSpec::Add, &[x, shortcut])
    }

    /// Squeeze-and-excitation gate over the channel axis
    fn channel_attention(
        &self,
        g: &mut GraphBuilder,
        name: &str,
        input: StageId,
    ) -> Result<StageId, GraphError> {
        let channels = g.shape(input)?.channels();
        let squeeze_units = (channels / self.config.attention_reduction).max(1);

        let pooled = g.add(&format!("{}_pool", name), LayerSpec::GlobalAveragePooling, &[input])?;
        let squeezed = g.add(
            &format!("{}_squeeze", name),
            LayerSpec::Dense {
                units: squeeze_units,
                activation: Activation::Relu,
            },
            &[pooled],
        )?;
        let excited = g.add(
            &format!("{}_excite", name),
            LayerSpec::Dense {
                units: channels,
                activation: Activation::Sigmoid,
            },
            &[squeezed],
        )?;
        let gate = g.add(
            &format!("{}_reshape", name),
            LayerSpec::Reshape {
                target: TensorShape::new(vec![1, 1, channels]),
            },
            &[excited],
        )?;
        g.add(&format!("{}_scale", name), LayerSpec::Multiply, &[input, gate])
    }
}
