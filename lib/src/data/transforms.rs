use serde::{Deserialize, Serialize};

use super::{Sample, INPUT_DIMENSION};
use crate::config::VoltageRangeConfig;

const SOURCE_MIN: f32 = -1.0;
const SOURCE_MAX: f32 = 1.0;

/// Linear map from the [-1, 1] ring coordinates to per-electrode voltages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageRange {
  v_min: [f32; INPUT_DIMENSION],
  v_max: [f32; INPUT_DIMENSION],
}

impl VoltageRange {
  pub fn new(v_min: [f32; INPUT_DIMENSION], v_max: [f32; INPUT_DIMENSION]) -> Self {
    Self { v_min, v_max }
  }

  pub fn apply(&self, sample: &Sample) -> Sample {
    let mut out = [0.0; INPUT_DIMENSION];
    for i in 0..INPUT_DIMENSION {
      let scale = (self.v_max[i] - self.v_min[i]) / (SOURCE_MAX - SOURCE_MIN);
      out[i] = (sample[i] - SOURCE_MIN) * scale + self.v_min[i];
    }
    out
  }
}

impl From<VoltageRangeConfig> for VoltageRange {
  fn from(config: VoltageRangeConfig) -> Self {
    Self::new(config.v_min, config.v_max)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maps_interval_endpoints_onto_electrode_range() {
    let range = VoltageRange::new([-1.2, -1.2], [0.7, 0.7]);
    let low = range.apply(&[-1.0, -1.0]);
    let high = range.apply(&[1.0, 1.0]);
    let mid = range.apply(&[0.0, 1.0]);
    assert!((low[0] + 1.2).abs() < 1e-6 && (low[1] + 1.2).abs() < 1e-6);
    assert!((high[0] - 0.7).abs() < 1e-6 && (high[1] - 0.7).abs() < 1e-6);
    assert!((mid[0] + 0.25).abs() < 1e-6);
    assert!((mid[1] - 0.7).abs() < 1e-6);
  }
}
