//! Trainable processors.
//!
//! The experiment only talks to a model through [`Processor`] (inference and
//! inspection) and [`Trainable`] (the gradient step the fitter drives).
//! [`DnpuSurrogate`] is the concrete network used by the binary.

pub mod surrogate;

use serde::{Deserialize, Serialize};

pub use surrogate::*;

use crate::{
  data::{Sample, Target},
  error::{Result, RingError},
};

/// Network shape of the surrogate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
  /// 2 -> 16 -> 1
  #[default]
  Small,
  /// 2 -> 32 -> 16 -> 1
  Medium,
}

pub trait Processor {
  /// One output per input sample, in input order.
  fn infer(&mut self, inputs: &[Sample]) -> Vec<f32>;

  /// Current values of every trainable tensor.
  fn parameters(&self) -> Vec<Vec<f32>>;

  /// Overwrites every trainable tensor, in the order of [`Processor::parameters`].
  fn load_parameters(&mut self, parameters: &[Vec<f32>]) -> Result<()>;

  /// Stop applying parameter updates.
  fn set_eval_mode(&mut self);

  fn set_train_mode(&mut self);

  fn is_training(&self) -> bool;
}

/// Rejects parameter sets whose tensor count or sizes differ from `current`.
/// Tensors that have not been materialised yet (empty in `current`) accept any size.
pub(crate) fn check_parameters(current: &[Vec<f32>], parameters: &[Vec<f32>]) -> Result<()> {
  if current.len() != parameters.len() {
    return Err(RingError::shape_mismatch(format!(
      "{} parameter tensors for a model with {}",
      parameters.len(),
      current.len()
    )));
  }
  for (i, (have, new)) in current.iter().zip(parameters).enumerate() {
    if !have.is_empty() && have.len() != new.len() {
      return Err(RingError::shape_mismatch(format!(
        "parameter tensor {i} holds {} values, expected {}",
        new.len(),
        have.len()
      )));
    }
  }
  Ok(())
}

pub trait Trainable: Processor {
  /// Scores one sample and, in train mode, applies one optimizer update.
  /// Returns the loss measured before the update.
  fn train_step(&mut self, input: &Sample, target: &Target) -> f32;
}
