use tracing::{debug, instrument};

use super::SplitResult;
use crate::{
  algorithm::Criterion,
  data::{InputsVec, TargetsVec},
  error::{Result, RingError},
  performance::{perceptron, target_correlation},
  processor::Processor,
};

/// Scores a fitted model on one labeled subset.
///
/// The model is switched to eval mode and the subset is stably sorted by
/// class before inference, so outputs of each class are contiguous. The
/// returned result has no performance history; the caller attaches it.
#[instrument(skip_all, fields(samples = subset.0.len()))]
pub fn postprocess<P: Processor + ?Sized>(
  subset: (InputsVec, TargetsVec),
  model: &mut P,
  criterion: Criterion,
) -> Result<SplitResult> {
  let (inputs, targets) = subset;
  if inputs.len() != targets.len() {
    return Err(RingError::shape_mismatch(format!(
      "{} inputs for {} targets",
      inputs.len(),
      targets.len()
    )));
  }
  if inputs.is_empty() {
    return Err(RingError::shape_mismatch("cannot postprocess an empty subset"));
  }
  model.set_eval_mode();

  let mut order: Vec<usize> = (0..targets.len()).collect();
  order.sort_by(|&a, &b| targets[a][0].total_cmp(&targets[b][0]));
  let inputs: InputsVec = order.iter().map(|&i| inputs[i]).collect();
  let targets: TargetsVec = order.iter().map(|&i| targets[i]).collect();

  let best_output = model.infer(&inputs);
  if best_output.len() != inputs.len() {
    return Err(RingError::shape_mismatch(format!(
      "model returned {} outputs for {} inputs",
      best_output.len(),
      inputs.len()
    )));
  }
  let performance = criterion.evaluate(&best_output, &targets)?;
  let accuracy = perceptron(&best_output, &targets)?;
  let correlation = target_correlation(&best_output, &targets)?;
  debug!(
    "performance {performance:.6}, accuracy {:.2}%, correlation {correlation:.4}",
    accuracy.accuracy_value * 100.0
  );

  Ok(SplitResult {
    performance,
    inputs,
    targets,
    best_output,
    accuracy,
    correlation,
    performance_history: None,
  })
}
