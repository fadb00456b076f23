pub mod fitter;

use serde::{Deserialize, Serialize};

pub use fitter::*;

use crate::{
  config::AlgorithmConfig,
  data::Target,
  error::{Result, RingError},
};

/// Loss used to score predictions against targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
  /// Mean squared error against the class component of the target.
  #[default]
  MseLoss,
}

impl Criterion {
  pub fn evaluate(&self, predictions: &[f32], targets: &[Target]) -> Result<f32> {
    if predictions.len() != targets.len() {
      return Err(RingError::shape_mismatch(format!(
        "{} predictions for {} targets",
        predictions.len(),
        targets.len()
      )));
    }
    if predictions.is_empty() {
      return Err(RingError::shape_mismatch("cannot score an empty batch"));
    }
    match self {
      Criterion::MseLoss => {
        let sum: f64 = predictions
          .iter()
          .zip(targets)
          .map(|(p, t)| (f64::from(*p) - f64::from(t[0])).powi(2))
          .sum();
        Ok((sum / predictions.len() as f64) as f32)
      }
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
  #[default]
  Sgd,
}

/// Update rule compiled into the processor graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optimizer {
  pub kind: OptimizerKind,
  pub learning_rate: f32,
}

pub fn get_criterion(config: &AlgorithmConfig) -> Criterion {
  config.criterion
}

pub fn get_optimizer(config: &AlgorithmConfig) -> Optimizer {
  Optimizer {
    kind: config.optimizer,
    learning_rate: config.learning_rate,
  }
}
