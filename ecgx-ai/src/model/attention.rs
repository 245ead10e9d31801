//! Reference evaluator for the channel-attention gate
//!
//! Computes the squeeze-and-excitation stage numerically for one feature map
//! of shape (H, W, C): global average pool → Dense(relu) → Dense(sigmoid) →
//! per-channel scale. Used to check the gate's invariants, not for inference.

use super::layer::Activation;
use super::GraphError;
use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const STAGE: &str = "attention";

fn shape_error(reason: String) -> GraphError {
    GraphError::Shape {
        stage: STAGE.to_string(),
        reason,
    }
}

/// Dense layer weights: `weights` is (inputs, units)
#[derive(Debug, Clone, PartialEq)]
pub struct DenseWeights {
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

impl DenseWeights {
    pub fn new(
        weights: Array2<f32>,
        bias: Array1<f32>,
        activation: Activation,
    ) -> Result<Self, GraphError> {
        if weights.ncols() != bias.len() {
            return Err(shape_error(format!(
                "dense weights have {} units but bias has {}",
                weights.ncols(),
                bias.len()
            )));
        }
        Ok(Self {
            weights,
            bias,
            activation,
        })
    }

    /// Glorot-uniform weights, zero bias
    pub fn glorot(inputs: usize, units: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + units).max(1) as f32).sqrt();
        let weights = Array2::from_shape_simple_fn((inputs, units), || rng.gen_range(-limit..=limit));
        Self {
            weights,
            bias: Array1::zeros(units),
            activation,
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn units(&self) -> usize {
        self.weights.ncols()
    }

    pub fn forward(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let activation = self.activation;
        (input.dot(&self.weights) + &self.bias).mapv(|v| activation.apply(v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAttention {
    squeeze: DenseWeights,
    excite: DenseWeights,
}

impl ChannelAttention {
    /// `squeeze` maps C → S with relu, `excite` maps S → C with sigmoid
    pub fn new(squeeze: DenseWeights, excite: DenseWeights) -> Result<Self, GraphError> {
        if squeeze.units() != excite.inputs() || excite.units() != squeeze.inputs() {
            return Err(shape_error(format!(
                "squeeze {}→{} does not chain with excite {}→{}",
                squeeze.inputs(),
                squeeze.units(),
                excite.inputs(),
                excite.units()
            )));
        }
        if squeeze.activation != Activation::Relu || excite.activation != Activation::Sigmoid {
            return Err(shape_error(
                "gate needs relu squeeze and sigmoid excite".to_string(),
            ));
        }
        Ok(Self { squeeze, excite })
    }

    /// Randomly initialized gate with squeeze width `channels / reduction`
    pub fn seeded(channels: usize, reduction: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let squeeze_units = (channels / reduction.max(1)).max(1);
        Self {
            squeeze: DenseWeights::glorot(channels, squeeze_units, Activation::Relu, &mut rng),
            excite: DenseWeights::glorot(squeeze_units, channels, Activation::Sigmoid, &mut rng),
        }
    }

    pub fn channels(&self) -> usize {
        self.squeeze.inputs()
    }

    /// Per-channel gate weights in [0, 1]
    pub fn gate(&self, x: &Array3<f32>) -> Result<Array1<f32>, GraphError> {
        let (h, w, c) = x.dim();
        if c != self.channels() {
            return Err(shape_error(format!(
                "feature map has {} channels, gate expects {}",
                c,
                self.channels()
            )));
        }
        if h == 0 || w == 0 {
            return Err(shape_error("feature map has no spatial extent".to_string()));
        }
        let pooled = x.sum_axis(Axis(0)).sum_axis(Axis(0)) / (h * w) as f32;
        let squeezed = self.squeeze.forward(pooled.view());
        Ok(self.excite.forward(squeezed.view()))
    }

    /// Input scaled channel-wise by the gate; same shape as the input
    pub fn apply(&self, x: &Array3<f32>) -> Result<Array3<f32>, GraphError> {
        let gate = self.gate(x)?;
        Ok(x * &gate)
    }
}
