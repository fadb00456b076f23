//! Synthetic ring dataset.
//!
//! Class 0 fills a disk around the origin, class 1 fills a ring around it,
//! and the two regions are separated by an empty band of width `gap`. The
//! inner radius is chosen so that both regions have the same area, which keeps
//! uniform rejection sampling balanced.

use std::{fmt::Write as _, path::Path};

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{transforms::VoltageRange, InputsVec, Sample, Target, TargetsVec, INPUT_DIMENSION};
use crate::error::{Result, RingError};

pub const DATA_FILE: &str = "ring_data.txt";
pub const METADATA_FILE: &str = "ring_data.yaml";

const OUTER_RADIUS: f32 = 1.0;

#[derive(Debug, Serialize, Deserialize)]
struct RingMetadata {
  gap: f32,
  sample_no: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingDataset {
  gap: f32,
  /// raw coordinates in [-1, 1]
  inputs: InputsVec,
  targets: TargetsVec,
  transform: Option<VoltageRange>,
}

/// Radius of the class 0 disk such that disk and ring areas match.
pub fn inner_radius(gap: f32) -> f32 {
  ((2.0 * OUTER_RADIUS * OUTER_RADIUS - gap * gap).sqrt() - gap) / 2.0
}

impl RingDataset {
  #[instrument(skip(transform, rng))]
  pub fn generate<R: Rng>(
    sample_no: usize,
    gap: f32,
    transform: Option<VoltageRange>,
    rng: &mut R,
  ) -> Result<Self> {
    if !(0.0..OUTER_RADIUS).contains(&gap) {
      return Err(RingError::configuration(format!(
        "gap must lie in [0, {OUTER_RADIUS}), got {gap}"
      )));
    }
    let radius = inner_radius(gap);
    let wanted_zero = sample_no / 2;
    let wanted_one = sample_no - wanted_zero;

    let mut samples: Vec<(Sample, Target)> = Vec::with_capacity(sample_no);
    let (mut zeros, mut ones) = (0, 0);
    while zeros < wanted_zero || ones < wanted_one {
      let point: Sample = [
        rng.gen_range(-OUTER_RADIUS..=OUTER_RADIUS),
        rng.gen_range(-OUTER_RADIUS..=OUTER_RADIUS),
      ];
      let r = (point[0] * point[0] + point[1] * point[1]).sqrt();
      if r < radius && zeros < wanted_zero {
        samples.push((point, [0.0]));
        zeros += 1;
      } else if r >= radius + gap && r <= OUTER_RADIUS && ones < wanted_one {
        samples.push((point, [1.0]));
        ones += 1;
      }
    }
    samples.shuffle(rng);
    let (inputs, targets) = samples.into_iter().unzip();
    info!("generated {sample_no} ring samples, inner radius {radius:.4}");

    Ok(Self {
      gap,
      inputs,
      targets,
      transform,
    })
  }

  /// Reads a dataset written by [`RingDataset::save`].
  #[instrument(skip(transform))]
  pub fn load(dir: &Path, transform: Option<VoltageRange>) -> Result<Self> {
    let data_path = dir.join(DATA_FILE);
    let metadata_path = dir.join(METADATA_FILE);
    for path in [&data_path, &metadata_path] {
      if !path.is_file() {
        return Err(RingError::configuration(format!(
          "dataset directory {} is missing {}",
          dir.display(),
          path.display()
        )));
      }
    }

    let metadata = std::fs::read_to_string(&metadata_path)
      .map_err(|e| RingError::filesystem(&metadata_path, e))?;
    let metadata: RingMetadata = serde_yaml::from_str(&metadata)
      .map_err(|e| RingError::configuration(format!("{}: {e}", metadata_path.display())))?;
    let content =
      std::fs::read_to_string(&data_path).map_err(|e| RingError::filesystem(&data_path, e))?;
    let (inputs, targets) = parse_dataset(&content)?;
    if inputs.len() != metadata.sample_no {
      return Err(RingError::configuration(format!(
        "{} holds {} samples but its metadata announces {}",
        data_path.display(),
        inputs.len(),
        metadata.sample_no
      )));
    }
    info!("loaded {} ring samples from {}", inputs.len(), dir.display());

    Ok(Self {
      gap: metadata.gap,
      inputs,
      targets,
      transform,
    })
  }

  /// Writes the raw coordinates, so a reload can apply a different transform.
  pub fn save(&self, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| RingError::filesystem(dir, e))?;

    let mut buff = String::new();
    for (input, target) in self.inputs.iter().zip(self.targets.iter()) {
      // writing into a String cannot fail
      let _ = writeln!(buff, "{} {} {}", input[0], input[1], target[0]);
    }
    let data_path = dir.join(DATA_FILE);
    std::fs::write(&data_path, buff).map_err(|e| RingError::filesystem(&data_path, e))?;

    let metadata = RingMetadata {
      gap: self.gap,
      sample_no: self.len(),
    };
    let metadata_path = dir.join(METADATA_FILE);
    std::fs::write(&metadata_path, serde_yaml::to_string(&metadata)?)
      .map_err(|e| RingError::filesystem(&metadata_path, e))
  }

  pub fn gap(&self) -> f32 {
    self.gap
  }

  pub fn len(&self) -> usize {
    self.inputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inputs.is_empty()
  }

  pub fn get(&self, index: usize) -> (Sample, Target) {
    let input = match &self.transform {
      Some(transform) => transform.apply(&self.inputs[index]),
      None => self.inputs[index],
    };
    (input, self.targets[index])
  }

  /// Gathers the samples at `indices`, in that order.
  pub fn select(&self, indices: &[usize]) -> (InputsVec, TargetsVec) {
    indices.iter().map(|&i| self.get(i)).unzip()
  }
}

pub fn parse_dataset(content: &str) -> Result<(InputsVec, TargetsVec)> {
  let mut x: InputsVec = Vec::new();
  let mut y: TargetsVec = Vec::new();
  for (number, line) in content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
    let parts = line
      .split_whitespace()
      .map(|val| val.parse::<f32>())
      .collect::<std::result::Result<Vec<_>, _>>()
      .map_err(|e| RingError::configuration(format!("line {}: {e}", number + 1)))?;
    if parts.len() != INPUT_DIMENSION + 1 {
      return Err(RingError::configuration(format!(
        "line {}: expected {} values, found {}",
        number + 1,
        INPUT_DIMENSION + 1,
        parts.len()
      )));
    }
    let label = parts[INPUT_DIMENSION];
    if label != 0.0 && label != 1.0 {
      return Err(RingError::configuration(format!(
        "line {}: class label must be 0 or 1, found {label}",
        number + 1
      )));
    }
    x.push([parts[0], parts[1]]);
    y.push([label]);
  }
  Ok((x, y))
}
