pub mod loader;
pub mod ring;
pub mod transforms;
pub mod types;

use std::path::Path;

use rand::Rng;
use tracing::info;

pub use loader::*;
pub use ring::RingDataset;
pub use transforms::VoltageRange;
pub use types::*;

use crate::{config::Configs, error::Result};

/// Produces the train, dev and test loaders for one gap value.
///
/// With `data.load` set the dataset is read from `data_dir`, otherwise a fresh
/// one is generated and, when `data_dir` is given, written there.
pub fn get_ring_data<R: Rng>(
  gap: f32,
  configs: &Configs,
  transform: Option<VoltageRange>,
  data_dir: Option<&Path>,
  rng: &mut R,
) -> Result<SplitLoaders> {
  let dataset = match (configs.data.load, data_dir) {
    (true, Some(dir)) => RingDataset::load(dir, transform)?,
    (true, None) => {
      return Err(crate::error::RingError::configuration(
        "data.load is set but no dataset directory was given",
      ))
    }
    (false, dir) => {
      let dataset = RingDataset::generate(configs.data.sample_no, gap, transform, rng)?;
      if let Some(dir) = dir {
        dataset.save(dir)?;
        info!("saved generated dataset to {}", dir.display());
      }
      dataset
    }
  };
  split(
    dataset,
    configs.algorithm.batch_size,
    &configs.data.split_percentages,
    rng,
  )
}

#[cfg(test)]
mod tests {
  use rand::{rngs::StdRng, SeedableRng};

  use super::*;
  use crate::config::test_configs;

  #[test]
  fn generate_then_load_gives_same_split_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let mut configs = test_configs(dir.path());
    let mut rng = StdRng::seed_from_u64(0);

    let generated = get_ring_data(0.4, &configs, None, Some(&data_dir), &mut rng).unwrap();
    assert_eq!(generated.train.indices().len(), 60);

    configs.data.load = true;
    let loaded = get_ring_data(0.1, &configs, None, Some(&data_dir), &mut rng).unwrap();
    assert_eq!(loaded.gap(), 0.4);
    assert_eq!(loaded.train.indices().len(), 60);
    assert_eq!(loaded.dev.indices().len(), 20);
    assert_eq!(loaded.test.indices().len(), 20);
  }

  #[test]
  fn loading_without_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut configs = test_configs(dir.path());
    configs.data.load = true;
    let mut rng = StdRng::seed_from_u64(0);
    assert!(get_ring_data(0.4, &configs, None, None, &mut rng).is_err());
  }
}
