use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Split;
use crate::{
  data::{InputsVec, TargetsVec},
  error::{Result, RingError},
  performance::PerceptronResult,
  utils::{load_binary, save_binary},
};

pub const RESULTS_FILE: &str = "results.bin";
pub const CONFIGS_FILE: &str = "configs.yaml";

/// Everything measured on one split after training.
///
/// `inputs`, `targets` and `best_output` are aligned and sorted by class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitResult {
  /// Criterion value over the whole split.
  pub performance: f32,
  pub inputs: InputsVec,
  pub targets: TargetsVec,
  pub best_output: Vec<f32>,
  pub accuracy: PerceptronResult,
  pub correlation: f32,
  /// Loss per epoch, only kept for the train and dev splits.
  pub performance_history: Option<Vec<f32>>,
}

impl SplitResult {
  pub fn len(&self) -> usize {
    self.inputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inputs.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
  pub gap: String,
  pub train_results: SplitResult,
  pub dev_results: Option<SplitResult>,
  pub test_results: Option<SplitResult>,
}

impl ExperimentResult {
  /// Assembles the per-split results; a missing train split is an error.
  pub fn assemble(
    gap: String,
    train_results: Option<SplitResult>,
    dev_results: Option<SplitResult>,
    test_results: Option<SplitResult>,
  ) -> Result<Self> {
    let train_results = train_results.ok_or(RingError::MissingSplit("train"))?;
    Ok(Self {
      gap,
      train_results,
      dev_results,
      test_results,
    })
  }

  pub fn get(&self, split: Split) -> Option<&SplitResult> {
    match split {
      Split::Train => Some(&self.train_results),
      Split::Dev => self.dev_results.as_ref(),
      Split::Test => self.test_results.as_ref(),
    }
  }

  /// Present splits in Train, Dev, Test order.
  pub fn splits(&self) -> impl Iterator<Item = (Split, &SplitResult)> {
    Split::ALL
      .into_iter()
      .filter_map(move |split| self.get(split).map(|r| (split, r)))
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    save_binary(path, self)
  }

  pub fn load(path: &Path) -> Result<Self> {
    load_binary(path)
  }
}

#[cfg(test)]
pub(crate) fn split_result(outputs: &[f32], classes: &[f32]) -> SplitResult {
  use crate::performance::{perceptron, target_correlation};

  let targets: TargetsVec = classes.iter().map(|&c| [c]).collect();
  SplitResult {
    performance: 0.1,
    inputs: outputs.iter().map(|&o| [o, -o]).collect(),
    accuracy: perceptron(outputs, &targets).unwrap(),
    correlation: target_correlation(outputs, &targets).unwrap(),
    targets,
    best_output: outputs.to_vec(),
    performance_history: Some(vec![0.5, 0.3, 0.1]),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn train_results_are_mandatory() {
    let err = ExperimentResult::assemble("0.4".into(), None, None, None).unwrap_err();
    assert!(matches!(err, RingError::MissingSplit("train")));
  }

  #[test]
  fn present_splits_in_order() {
    let train = split_result(&[0.1, 0.9], &[0.0, 1.0]);
    let test = split_result(&[0.2, 0.7], &[0.0, 1.0]);
    let result = ExperimentResult::assemble("0.4".into(), Some(train), None, Some(test)).unwrap();
    let splits: Vec<Split> = result.splits().map(|(s, _)| s).collect();
    assert_eq!(splits, vec![Split::Train, Split::Test]);
    assert!(result.get(Split::Dev).is_none());
  }

  #[test]
  fn saved_results_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(RESULTS_FILE);
    let train = split_result(&[0.1, 0.8, 0.3], &[0.0, 1.0, 0.0]);
    let result = ExperimentResult::assemble("0.2".into(), Some(train), None, None).unwrap();
    result.save(&path).unwrap();
    assert_eq!(ExperimentResult::load(&path).unwrap(), result);
  }
}
