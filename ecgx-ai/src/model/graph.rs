//! Immutable model graph
//!
//! Stages are appended in topological order through [`GraphBuilder`]; each
//! stage's output shape and parameter count are fixed at insertion. Once
//! finished, a [`ModelGraph`] is a plain value that can be inspected,
//! summarized or serialized.

use super::layer::{LayerSpec, ParamCount, TensorShape};
use super::training::TrainingConfig;
use super::GraphError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;

pub type StageId = usize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub layer: LayerSpec,
    pub inputs: Vec<StageId>,
    pub output_shape: TensorShape,
    pub params: ParamCount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelGraph {
    name: String,
    stages: Vec<Stage>,
    inputs: Vec<StageId>,
    output: StageId,
    training: TrainingConfig,
}

impl ModelGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Input stages in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = &Stage> {
        self.inputs.iter().map(|&id| &self.stages[id])
    }

    pub fn output(&self) -> &Stage {
        &self.stages[self.output]
    }

    pub fn output_shape(&self) -> &TensorShape {
        &self.output().output_shape
    }

    pub fn training(&self) -> &TrainingConfig {
        &self.training
    }

    pub fn params(&self) -> ParamCount {
        self.stages.iter().map(|s| s.params).sum()
    }

    /// Per-stage table: name, layer kind, output shape, parameters, inputs
    pub fn summary(&self) -> String {
        let name_width = self
            .stages
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(0)
            .max("Stage".len());
        let mut out = String::new();
        let _ = writeln!(out, "Model: \"{}\"", self.name);
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<22}  {:<18}  {:>10}  Connected to",
            "Stage", "Layer", "Output shape", "Params"
        );
        for stage in &self.stages {
            let sources: Vec<&str> = stage
                .inputs
                .iter()
                .map(|&id| self.stages[id].name.as_str())
                .collect();
            let _ = writeln!(
                out,
                "{:<name_width$}  {:<22}  {:<18}  {:>10}  {}",
                stage.name,
                stage.layer.kind(),
                stage.output_shape.to_string(),
                stage.params.total(),
                sources.join(", ")
            );
        }
        let params = self.params();
        let _ = writeln!(out, "Total params: {}", params.total());
        let _ = writeln!(out, "Trainable params: {}", params.trainable);
        let _ = writeln!(out, "Non-trainable params: {}", params.non_trainable);
        let _ = write!(
            out,
            "Optimizer: {}, loss: {}, metrics: {}",
            self.training.optimizer,
            self.training.loss,
            self.training
                .metrics
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Appends stages in order, inferring shapes as it goes
#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    stages: Vec<Stage>,
    names: HashMap<String, StageId>,
    inputs: Vec<StageId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&mut self, name: &str, shape: TensorShape) -> Result<StageId, GraphError> {
        let id = self.add(name, LayerSpec::Input { shape }, &[])?;
        self.inputs.push(id);
        Ok(id)
    }

    pub fn add(
        &mut self,
        name: &str,
        layer: LayerSpec,
        inputs: &[StageId],
    ) -> Result<StageId, GraphError> {
        if self.names.contains_key(name) {
            return Err(GraphError::DuplicateStage(name.to_string()));
        }
        let shapes = inputs
            .iter()
            .map(|&id| {
                self.stages
                    .get(id)
                    .map(|s| &s.output_shape)
                    .ok_or(GraphError::UnknownStage(id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let output_shape = layer.infer(name, &shapes)?;
        let params = layer.params(&shapes);

        let id = self.stages.len();
        self.stages.push(Stage {
            id,
            name: name.to_string(),
            layer,
            inputs: inputs.to_vec(),
            output_shape,
            params,
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn shape(&self, id: StageId) -> Result<&TensorShape, GraphError> {
        self.stages
            .get(id)
            .map(|s| &s.output_shape)
            .ok_or(GraphError::UnknownStage(id))
    }

    pub fn finish(
        self,
        name: &str,
        output: StageId,
        training: TrainingConfig,
    ) -> Result<ModelGraph, GraphError> {
        if self.inputs.is_empty() {
            return Err(GraphError::NoInputs);
        }
        if output >= self.stages.len() {
            return Err(GraphError::UnknownStage(output));
        }
        Ok(ModelGraph {
            name: name.to_string(),
            stages: self.stages,
            inputs: self.inputs,
            output,
            training,
        })
    }
}
