//! Experiment configuration.
//!
//! The YAML file is deserialized into typed structs, missing optional keys
//! take the defaults below, and [`Configs::validate`] runs once at load time.
//! Nothing downstream reads configuration by string key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
  algorithm::{Criterion, OptimizerKind},
  error::{Result, RingError},
  processor::Architecture,
};

const SPLIT_TOLERANCE: f64 = 1e-6;
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "bmp", "jpg"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configs {
  pub results_base_dir: PathBuf,
  /// Seeds dataset generation, the split permutation and batch shuffling.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub seed: Option<u64>,
  pub algorithm: AlgorithmConfig,
  pub data: DataConfig,
  #[serde(default)]
  pub processor: ProcessorConfig,
  #[serde(default)]
  pub plots: PlotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlgorithmConfig {
  pub epochs: usize,
  pub batch_size: usize,
  /// Accepted for compatibility with existing config files; loading is single threaded.
  pub worker_no: usize,
  #[serde(default = "default_learning_rate")]
  pub learning_rate: f32,
  #[serde(default)]
  pub criterion: Criterion,
  #[serde(default)]
  pub optimizer: OptimizerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
  #[serde(default = "default_gap")]
  pub gap: f32,
  /// Load a previously generated dataset from `data_dir` instead of generating one.
  pub load: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_dir: Option<PathBuf>,
  pub sample_no: usize,
  /// Train, dev and test fractions of the dataset.
  pub split_percentages: Vec<f64>,
  #[serde(default)]
  pub voltage_range: VoltageRangeConfig,
}

/// Electrode voltage window that the [-1, 1] ring coordinates are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoltageRangeConfig {
  pub v_min: [f32; 2],
  pub v_max: [f32; 2],
}

impl Default for VoltageRangeConfig {
  fn default() -> Self {
    Self {
      v_min: [-1.2, -1.2],
      v_max: [0.7, 0.7],
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessorConfig {
  #[serde(default)]
  pub architecture: Architecture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotConfig {
  #[serde(default = "default_extension")]
  pub extension: String,
}

impl Default for PlotConfig {
  fn default() -> Self {
    Self {
      extension: default_extension(),
    }
  }
}

fn default_learning_rate() -> f32 {
  5e-3
}

fn default_gap() -> f32 {
  0.4
}

fn default_extension() -> String {
  "png".to_string()
}

impl Configs {
  pub fn validate(&self) -> Result<()> {
    self.algorithm.validate()?;
    self.data.validate()?;
    if !IMAGE_EXTENSIONS.contains(&self.plots.extension.as_str()) {
      return Err(RingError::configuration(format!(
        "plots.extension must be one of {:?}, got {:?}",
        IMAGE_EXTENSIONS, self.plots.extension
      )));
    }
    Ok(())
  }
}

impl AlgorithmConfig {
  pub fn validate(&self) -> Result<()> {
    if self.epochs == 0 {
      return Err(RingError::configuration("algorithm.epochs must be positive"));
    }
    if self.batch_size == 0 {
      return Err(RingError::configuration("algorithm.batch_size must be positive"));
    }
    if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
      return Err(RingError::configuration(format!(
        "algorithm.learning_rate must be a positive number, got {}",
        self.learning_rate
      )));
    }
    Ok(())
  }
}

impl DataConfig {
  pub fn validate(&self) -> Result<()> {
    if !(0.0..1.0).contains(&self.gap) {
      return Err(RingError::configuration(format!(
        "data.gap must lie in [0, 1), got {}",
        self.gap
      )));
    }
    if self.sample_no == 0 {
      return Err(RingError::configuration("data.sample_no must be positive"));
    }
    if self.load && self.data_dir.is_none() {
      return Err(RingError::configuration(
        "data.load is set but no data.data_dir was given",
      ));
    }
    validate_split_percentages(&self.split_percentages)?;
    let range = &self.voltage_range;
    if range.v_min.iter().zip(range.v_max.iter()).any(|(lo, hi)| lo >= hi) {
      return Err(RingError::configuration(format!(
        "data.voltage_range needs v_min < v_max per electrode, got {:?} / {:?}",
        range.v_min, range.v_max
      )));
    }
    Ok(())
  }
}

/// A valid partition is three fractions in [0, 1] summing to one, with a non-empty train share.
pub fn validate_split_percentages(percentages: &[f64]) -> Result<()> {
  if percentages.len() != 3 {
    return Err(RingError::configuration(format!(
      "data.split_percentages needs train, dev and test entries, got {} values",
      percentages.len()
    )));
  }
  if percentages.iter().any(|p| !(0.0..=1.0).contains(p)) {
    return Err(RingError::configuration(format!(
      "data.split_percentages entries must lie in [0, 1], got {:?}",
      percentages
    )));
  }
  let total: f64 = percentages.iter().sum();
  if (total - 1.0).abs() > SPLIT_TOLERANCE {
    return Err(RingError::configuration(format!(
      "data.split_percentages must sum to 1, got {total}"
    )));
  }
  if percentages[0] <= 0.0 {
    return Err(RingError::configuration("the train split must not be empty"));
  }
  Ok(())
}

#[instrument]
pub fn load_configs(path: &Path) -> Result<Configs> {
  let content = std::fs::read_to_string(path).map_err(|e| RingError::filesystem(path, e))?;
  let configs: Configs = serde_yaml::from_str(&content)
    .map_err(|e| RingError::configuration(format!("{}: {e}", path.display())))?;
  configs.validate()?;
  debug!("loaded configs: {:?}", configs);
  Ok(configs)
}

pub fn save_configs(path: &Path, configs: &Configs) -> Result<()> {
  let buff = serde_yaml::to_string(configs)?;
  std::fs::write(path, buff).map_err(|e| RingError::filesystem(path, e))
}

#[cfg(test)]
pub(crate) fn test_configs(base_dir: &Path) -> Configs {
  Configs {
    results_base_dir: base_dir.to_path_buf(),
    seed: Some(7),
    algorithm: AlgorithmConfig {
      epochs: 3,
      batch_size: 8,
      worker_no: 0,
      learning_rate: 0.05,
      criterion: Criterion::MseLoss,
      optimizer: OptimizerKind::Sgd,
    },
    data: DataConfig {
      gap: 0.4,
      load: false,
      data_dir: None,
      sample_no: 100,
      split_percentages: vec![0.6, 0.2, 0.2],
      voltage_range: VoltageRangeConfig::default(),
    },
    processor: ProcessorConfig::default(),
    plots: PlotConfig::default(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINIMAL: &str = r#"
results_base_dir: tmp/output/ring
algorithm:
  epochs: 10
  batch_size: 32
  worker_no: 0
data:
  load: false
  sample_no: 500
  split_percentages: [0.8, 0.1, 0.1]
"#;

  fn parse(yaml: &str) -> Result<Configs> {
    let configs: Configs =
      serde_yaml::from_str(yaml).map_err(|e| RingError::configuration(e.to_string()))?;
    configs.validate()?;
    Ok(configs)
  }

  #[test]
  fn minimal_file_gets_defaults() {
    let configs = parse(MINIMAL).unwrap();
    assert_eq!(configs.data.gap, 0.4);
    assert_eq!(configs.algorithm.learning_rate, 5e-3);
    assert_eq!(configs.algorithm.criterion, Criterion::MseLoss);
    assert_eq!(configs.processor.architecture, Architecture::Small);
    assert_eq!(configs.data.voltage_range, VoltageRangeConfig::default());
    assert_eq!(configs.plots.extension, "png");
    assert_eq!(configs.seed, None);
  }

  #[test]
  fn missing_required_key_is_rejected() {
    let yaml = MINIMAL.replace("  sample_no: 500\n", "");
    assert!(matches!(parse(&yaml), Err(RingError::Configuration(_))));
  }

  #[test]
  fn split_percentages_must_partition() {
    assert!(validate_split_percentages(&[0.6, 0.2, 0.2]).is_ok());
    assert!(validate_split_percentages(&[1.0, 0.0, 0.0]).is_ok());
    assert!(validate_split_percentages(&[0.6, 0.2]).is_err());
    assert!(validate_split_percentages(&[0.6, 0.3, 0.3]).is_err());
    assert!(validate_split_percentages(&[1.2, -0.1, -0.1]).is_err());
    assert!(validate_split_percentages(&[0.0, 0.5, 0.5]).is_err());
  }

  #[test]
  fn load_requires_data_dir() {
    let yaml = MINIMAL.replace("load: false", "load: true");
    assert!(matches!(parse(&yaml), Err(RingError::Configuration(_))));
  }

  #[test]
  fn rejects_bad_numbers() {
    let dir = std::path::Path::new("unused");
    let mut configs = test_configs(dir);
    configs.algorithm.batch_size = 0;
    assert!(configs.validate().is_err());

    let mut configs = test_configs(dir);
    configs.data.gap = 1.0;
    assert!(configs.validate().is_err());

    let mut configs = test_configs(dir);
    configs.data.voltage_range.v_min = [0.7, -1.2];
    assert!(configs.validate().is_err());

    let mut configs = test_configs(dir);
    configs.plots.extension = "gif".to_string();
    assert!(configs.validate().is_err());
  }

  #[test]
  fn saved_configs_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configs.yaml");
    let configs = test_configs(dir.path());
    save_configs(&path, &configs).unwrap();
    assert_eq!(load_configs(&path).unwrap(), configs);
  }
}
