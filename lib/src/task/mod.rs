//! The ring classification experiment: train, score every split, plot, persist.

pub mod dirs;
pub mod plots;
pub mod postprocess;
pub mod results;

use plotters::style::RGBColor;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub use dirs::*;
pub use plots::plot_results;
pub use postprocess::postprocess;
pub use results::*;

use crate::{
  algorithm::{get_criterion, get_optimizer, train, Criterion, Optimizer},
  config::{save_configs, Configs, ProcessorConfig},
  data::{DataLoader, SplitLoaders},
  error::Result,
  processor::Trainable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
  Train,
  Dev,
  Test,
}

impl Split {
  pub const ALL: [Split; 3] = [Split::Train, Split::Dev, Split::Test];

  pub fn label(self) -> &'static str {
    match self {
      Split::Train => "Train",
      Split::Dev => "Dev",
      Split::Test => "Test",
    }
  }

  /// Plot colors for class 0 and class 1.
  pub fn colors(self) -> (RGBColor, RGBColor) {
    match self {
      // blue, cornflowerblue
      Split::Train => (RGBColor(0, 0, 255), RGBColor(100, 149, 237)),
      // orange, bisque
      Split::Dev => (RGBColor(255, 165, 0), RGBColor(255, 228, 196)),
      // green, springgreen
      Split::Test => (RGBColor(0, 128, 0), RGBColor(0, 255, 127)),
    }
  }
}

/// Runs one ring classification experiment on already split data.
///
/// `custom_model` builds the processor from the processor section of the
/// configuration and the optimizer derived from the algorithm section. Every
/// non-empty split is scored with the fitted model. Figures go to the run's
/// `results/` directory; the result blob and the configuration go to
/// `reproducibility/`.
#[instrument(skip_all, fields(gap = loaders.gap(), is_main = is_main))]
pub fn ring_task<P, F, R>(
  loaders: &SplitLoaders,
  custom_model: F,
  configs: &Configs,
  is_main: bool,
  rng: &mut R,
) -> Result<ExperimentResult>
where
  P: Trainable,
  F: FnOnce(&ProcessorConfig, &Optimizer) -> Result<P>,
  R: Rng,
{
  let gap = loaders.gap().to_string();
  let dirs = init_dirs(&gap, &configs.results_base_dir, is_main)?;
  let criterion = get_criterion(&configs.algorithm);
  let optimizer = get_optimizer(&configs.algorithm);
  let model = custom_model(&configs.processor, &optimizer)?;

  info!("{}", "=".repeat(90));
  info!(
    "Training on {} samples ({} dev, {} test), gap {gap}",
    loaders.train.indices().len(),
    loaders.dev.indices().len(),
    loaders.test.indices().len()
  );
  let (mut model, performances) = train(
    model,
    (&loaders.train, &loaders.dev),
    configs.algorithm.epochs,
    criterion,
    rng,
    Some(&dirs.reproducibility_dir),
  )?;

  let dev_history = (!performances.dev.is_empty()).then_some(performances.dev);
  let train_results = score_split(
    Split::Train,
    &loaders.train,
    &mut model,
    criterion,
    Some(performances.train),
  )?;
  let dev_results = score_split(Split::Dev, &loaders.dev, &mut model, criterion, dev_history)?;
  let test_results = score_split(Split::Test, &loaders.test, &mut model, criterion, None)?;
  let results = ExperimentResult::assemble(gap, train_results, dev_results, test_results)?;

  plot_results(&results, Some(&dirs.results_dir), &configs.plots.extension)?;
  results.save(&dirs.reproducibility_dir.join(RESULTS_FILE))?;
  save_configs(&dirs.reproducibility_dir.join(CONFIGS_FILE), configs)?;
  info!("Results saved to {}", dirs.main_dir.display());
  info!("{}", "=".repeat(90));
  Ok(results)
}

/// `None` for an empty split.
fn score_split<P: Trainable>(
  split: Split,
  loader: &DataLoader,
  model: &mut P,
  criterion: Criterion,
  history: Option<Vec<f32>>,
) -> Result<Option<SplitResult>> {
  if loader.is_empty() {
    return Ok(None);
  }
  let mut result = postprocess(loader.subset(), model, criterion)?;
  result.performance_history = history;
  info!(
    "{}: performance {:.6}, accuracy {:.2}%, correlation {:.4}",
    split.label(),
    result.performance,
    result.accuracy.accuracy_value * 100.0,
    result.correlation
  );
  Ok(Some(result))
}

#[cfg(test)]
mod tests {
  use rand::{rngs::StdRng, SeedableRng};

  use super::*;
  use crate::{
    algorithm::MODEL_FILE,
    config::test_configs,
    data::get_ring_data,
    processor::testing::LinearModel,
    utils::init_logging_tests,
  };

  fn linear_model(_: &ProcessorConfig, optimizer: &Optimizer) -> Result<LinearModel> {
    Ok(LinearModel {
      learning_rate: optimizer.learning_rate,
      ..LinearModel::new([0.1, -0.1], 0.0)
    })
  }

  #[test]
  fn three_splits_are_scored_and_persisted() {
    let _guard = init_logging_tests();
    let base = tempfile::tempdir().unwrap();
    let configs = test_configs(base.path());
    let mut rng = StdRng::seed_from_u64(11);
    let loaders = get_ring_data(configs.data.gap, &configs, None, None, &mut rng).unwrap();

    let results = ring_task(&loaders, linear_model, &configs, false, &mut rng).unwrap();
    assert_eq!(results.gap, "0.4");
    assert_eq!(results.train_results.len(), 60);
    assert_eq!(results.dev_results.as_ref().map(SplitResult::len), Some(20));
    assert_eq!(results.test_results.as_ref().map(SplitResult::len), Some(20));
    assert_eq!(results.train_results.performance_history.as_ref().map(Vec::len), Some(3));
    let dev = results.dev_results.as_ref().unwrap();
    assert_eq!(dev.performance_history.as_ref().map(Vec::len), Some(3));
    assert!(results.test_results.as_ref().unwrap().performance_history.is_none());

    let run = base.path().join("gap_0.4");
    let reproducibility = run.join(REPRODUCIBILITY_DIR);
    assert_eq!(ExperimentResult::load(&reproducibility.join(RESULTS_FILE)).unwrap(), results);
    let saved = crate::config::load_configs(&reproducibility.join(CONFIGS_FILE)).unwrap();
    assert_eq!(saved, configs);
    assert!(reproducibility.join(MODEL_FILE).is_file());
    for figure in ["training_profile", "input", "Train_output", "Dev_output", "Test_perceptron"] {
      assert!(run.join(RESULTS_DIR).join(format!("{figure}.png")).is_file(), "{figure}");
    }
  }

  #[test]
  fn train_only_split_leaves_dev_and_test_absent() {
    let _guard = init_logging_tests();
    let base = tempfile::tempdir().unwrap();
    let mut configs = test_configs(base.path());
    configs.data.split_percentages = vec![1.0, 0.0, 0.0];
    let mut rng = StdRng::seed_from_u64(3);
    let loaders = get_ring_data(configs.data.gap, &configs, None, None, &mut rng).unwrap();

    let results = ring_task(&loaders, linear_model, &configs, true, &mut rng).unwrap();
    assert_eq!(results.train_results.len(), 100);
    assert!(results.dev_results.is_none());
    assert!(results.test_results.is_none());

    let runs: Vec<_> = std::fs::read_dir(base.path().join("gap_0.4"))
      .unwrap()
      .map(|e| e.unwrap().path())
      .collect();
    assert_eq!(runs.len(), 1);
    assert!(!runs[0].join(RESULTS_DIR).join("Dev_output.png").exists());
    assert!(runs[0].join(RESULTS_DIR).join("Train_output.png").is_file());
  }

  #[test]
  fn empty_dev_share_still_scores_the_test_split() {
    let _guard = init_logging_tests();
    let base = tempfile::tempdir().unwrap();
    let mut configs = test_configs(base.path());
    configs.data.split_percentages = vec![0.8, 0.0, 0.2];
    let mut rng = StdRng::seed_from_u64(8);
    let loaders = get_ring_data(configs.data.gap, &configs, None, None, &mut rng).unwrap();

    let results = ring_task(&loaders, linear_model, &configs, false, &mut rng).unwrap();
    assert_eq!(results.train_results.len(), 80);
    assert_eq!(results.train_results.performance_history.as_ref().map(Vec::len), Some(3));
    assert!(results.dev_results.is_none());
    let test = results.test_results.as_ref().unwrap();
    assert_eq!(test.len(), 20);
    assert!(test.performance_history.is_none());

    let figures = base.path().join("gap_0.4").join(RESULTS_DIR);
    assert!(!figures.join("Dev_output.png").exists());
    assert!(!figures.join("Dev_perceptron.png").exists());
    assert!(figures.join("Test_output.png").is_file());
    assert!(figures.join("training_profile.png").is_file());
    let saved = ExperimentResult::load(
      &base.path().join("gap_0.4").join(REPRODUCIBILITY_DIR).join(RESULTS_FILE),
    )
    .unwrap();
    assert_eq!(saved, results);
  }

  #[test]
  fn model_construction_errors_abort_the_run() {
    let base = tempfile::tempdir().unwrap();
    let configs = test_configs(base.path());
    let mut rng = StdRng::seed_from_u64(5);
    let loaders = get_ring_data(configs.data.gap, &configs, None, None, &mut rng).unwrap();
    let failing = |_: &ProcessorConfig, _: &Optimizer| -> Result<LinearModel> {
      Err(crate::error::RingError::configuration("no such processor"))
    };
    assert!(ring_task(&loaders, failing, &configs, false, &mut rng).is_err());
  }

  #[test]
  fn split_labels_and_colors() {
    let labels: Vec<&str> = Split::ALL.iter().map(|s| s.label()).collect();
    assert_eq!(labels, vec!["Train", "Dev", "Test"]);
    assert_eq!(Split::Dev.colors().0, RGBColor(255, 165, 0));
  }
}
