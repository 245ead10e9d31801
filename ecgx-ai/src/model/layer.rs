//! Layer specifications with shape inference and parameter counting
//!
//! Shapes never include the batch axis. Convolution, dense and
//! batch-normalization layers act on the last (channel) axis.

use super::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tensor shape without the batch axis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TensorShape(Vec<usize>);

impl TensorShape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn elements(&self) -> usize {
        self.0.iter().product()
    }

    /// Size of the last axis (0 for a scalar shape)
    pub fn channels(&self) -> usize {
        self.0.last().copied().unwrap_or(0)
    }

    fn with_channels(&self, channels: usize) -> Self {
        let mut dims = self.0.clone();
        if let Some(last) = dims.last_mut() {
            *last = channels;
        }
        Self(dims)
    }
}

impl From<&[usize]> for TensorShape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        if dims.len() == 1 {
            write!(f, "({},)", dims[0])
        } else {
            write!(f, "({})", dims.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Swish,
}

impl Activation {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Swish => x * sigmoid(x),
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    Same,
    Valid,
}

/// Trainable and non-trainable parameter counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamCount {
    pub trainable: usize,
    pub non_trainable: usize,
}

impl ParamCount {
    pub fn trainable(count: usize) -> Self {
        Self {
            trainable: count,
            non_trainable: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.trainable + self.non_trainable
    }
}

impl std::ops::Add for ParamCount {
    type Output = ParamCount;

    fn add(self, other: ParamCount) -> ParamCount {
        ParamCount {
            trainable: self.trainable + other.trainable,
            non_trainable: self.non_trainable + other.non_trainable,
        }
    }
}

impl std::iter::Sum for ParamCount {
    fn sum<I: Iterator<Item = ParamCount>>(iter: I) -> ParamCount {
        iter.fold(ParamCount::default(), |acc, p| acc + p)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Input {
        shape: TensorShape,
    },
    Conv1d {
        filters: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        activation: Activation,
    },
    Conv2d {
        filters: usize,
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: Padding,
        activation: Activation,
    },
    Reshape {
        target: TensorShape,
    },
    /// Concatenation along the last axis
    Concatenate,
    Add,
    Multiply,
    BatchNorm,
    /// Mean over every axis except the last
    GlobalAveragePooling,
    Dense {
        units: usize,
        activation: Activation,
    },
    Dropout {
        rate: f32,
    },
}

fn conv_output(len: usize, kernel: usize, stride: usize, padding: Padding) -> Option<usize> {
    match padding {
        Padding::Same => Some(len.div_ceil(stride)),
        Padding::Valid => len.checked_sub(kernel).map(|d| d / stride + 1),
    }
}

/// Numpy-style broadcast of two shapes with equal rank
fn broadcast(a: &TensorShape, b: &TensorShape) -> Option<TensorShape> {
    if a.rank() != b.rank() {
        return None;
    }
    a.dims()
        .iter()
        .zip(b.dims())
        .map(|(&x, &y)| match (x, y) {
            _ if x == y => Some(x),
            (1, y) => Some(y),
            (x, 1) => Some(x),
            _ => None,
        })
        .collect::<Option<Vec<usize>>>()
        .map(TensorShape)
}

impl LayerSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            LayerSpec::Input { .. } => "Input",
            LayerSpec::Conv1d { .. } => "Conv1D",
            LayerSpec::Conv2d { .. } => "Conv2D",
            LayerSpec::Reshape { .. } => "Reshape",
            LayerSpec::Concatenate => "Concatenate",
            LayerSpec::Add => "Add",
            LayerSpec::Multiply => "Multiply",
            LayerSpec::BatchNorm => "BatchNormalization",
            LayerSpec::GlobalAveragePooling => "GlobalAveragePooling",
            LayerSpec::Dense { .. } => "Dense",
            LayerSpec::Dropout { .. } => "Dropout",
        }
    }

    /// Number of inputs the layer takes; `None` means two or more
    fn arity(&self) -> Option<usize> {
        match self {
            LayerSpec::Input { .. } => Some(0),
            LayerSpec::Concatenate | LayerSpec::Add | LayerSpec::Multiply => None,
            _ => Some(1),
        }
    }

    /// Output shape for the given input shapes
    ///
    /// `stage` only labels the error.
    pub fn infer(&self, stage: &str, inputs: &[&TensorShape]) -> Result<TensorShape, GraphError> {
        let fail = |reason: String| GraphError::Shape {
            stage: stage.to_string(),
            reason,
        };

        match self.arity() {
            Some(expected) if inputs.len() != expected => {
                return Err(fail(format!(
                    "{} takes {} input(s), got {}",
                    self.kind(),
                    expected,
                    inputs.len()
                )))
            }
            None if inputs.len() < 2 => {
                return Err(fail(format!(
                    "{} needs at least 2 inputs, got {}",
                    self.kind(),
                    inputs.len()
                )))
            }
            _ => {}
        }

        match self {
            LayerSpec::Input { shape } => {
                if shape.rank() == 0 || shape.dims().contains(&0) {
                    return Err(fail(format!("invalid input shape {}", shape)));
                }
                Ok(shape.clone())
            }
            LayerSpec::Conv1d {
                filters,
                kernel,
                stride,
                padding,
                ..
            } => {
                let input = inputs[0];
                if input.rank() != 2 {
                    return Err(fail(format!("Conv1D expects rank 2 input, got {}", input)));
                }
                if *filters == 0 || *kernel == 0 || *stride == 0 {
                    return Err(fail("Conv1D filters, kernel and stride must be > 0".into()));
                }
                let steps = conv_output(input.dims()[0], *kernel, *stride, *padding)
                    .filter(|&n| n > 0)
                    .ok_or_else(|| fail(format!("kernel {} longer than input {}", kernel, input)))?;
                Ok(TensorShape(vec![steps, *filters]))
            }
            LayerSpec::Conv2d {
                filters,
                kernel,
                stride,
                padding,
                ..
            } => {
                let input = inputs[0];
                if input.rank() != 3 {
                    return Err(fail(format!("Conv2D expects rank 3 input, got {}", input)));
                }
                if *filters == 0 || kernel.0 == 0 || kernel.1 == 0 || stride.0 == 0 || stride.1 == 0
                {
                    return Err(fail("Conv2D filters, kernel and stride must be > 0".into()));
                }
                let dims = input.dims();
                let rows = conv_output(dims[0], kernel.0, stride.0, *padding).filter(|&n| n > 0);
                let cols = conv_output(dims[1], kernel.1, stride.1, *padding).filter(|&n| n > 0);
                match (rows, cols) {
                    (Some(rows), Some(cols)) => Ok(TensorShape(vec![rows, cols, *filters])),
                    _ => Err(fail(format!(
                        "kernel {:?} does not fit input {}",
                        kernel, input
                    ))),
                }
            }
            LayerSpec::Reshape { target } => {
                if target.elements() != inputs[0].elements() || target.rank() == 0 {
                    return Err(fail(format!(
                        "cannot reshape {} ({} elements) to {} ({} elements)",
                        inputs[0],
                        inputs[0].elements(),
                        target,
                        target.elements()
                    )));
                }
                Ok(target.clone())
            }
            LayerSpec::Concatenate => {
                let first = inputs[0];
                let leading = &first.dims()[..first.rank().saturating_sub(1)];
                let mut channels = 0;
                for shape in inputs {
                    if shape.rank() != first.rank()
                        || &shape.dims()[..shape.rank().saturating_sub(1)] != leading
                    {
                        return Err(fail(format!(
                            "cannot concatenate {} with {}",
                            first, shape
                        )));
                    }
                    channels += shape.channels();
                }
                Ok(first.with_channels(channels))
            }
            LayerSpec::Add | LayerSpec::Multiply => {
                inputs[1..].iter().try_fold(inputs[0].clone(), |acc, shape| {
                    broadcast(&acc, shape).ok_or_else(|| {
                        fail(format!(
                            "{} shapes {} and {} are not broadcast compatible",
                            self.kind(),
                            acc,
                            shape
                        ))
                    })
                })
            }
            LayerSpec::BatchNorm => Ok(inputs[0].clone()),
            LayerSpec::GlobalAveragePooling => {
                if inputs[0].rank() < 2 {
                    return Err(fail(format!(
                        "pooling needs at least rank 2, got {}",
                        inputs[0]
                    )));
                }
                Ok(TensorShape(vec![inputs[0].channels()]))
            }
            LayerSpec::Dense { units, .. } => {
                if *units == 0 {
                    return Err(fail("Dense units must be > 0".into()));
                }
                Ok(inputs[0].with_channels(*units))
            }
            LayerSpec::Dropout { rate } => {
                if !(0.0..1.0).contains(rate) {
                    return Err(fail(format!("dropout rate {} outside [0, 1)", rate)));
                }
                Ok(inputs[0].clone())
            }
        }
    }

    /// Parameter count given already validated input shapes
    pub fn params(&self, inputs: &[&TensorShape]) -> ParamCount {
        let in_channels = inputs.first().map(|s| s.channels()).unwrap_or(0);
        match self {
            LayerSpec::Conv1d {
                filters, kernel, ..
            } => ParamCount::trainable(kernel * in_channels * filters + filters),
            LayerSpec::Conv2d {
                filters, kernel, ..
            } => ParamCount::trainable(kernel.0 * kernel.1 * in_channels * filters + filters),
            LayerSpec::Dense { units, .. } => ParamCount::trainable(in_channels * units + units),
            // gamma, beta trainable; moving mean, moving variance not
            LayerSpec::BatchNorm => ParamCount {
                trainable: 2 * in_channels,
                non_trainable: 2 * in_channels,
            },
            _ => ParamCount::default(),
        }
    }
}
