use std::rc::Rc;

use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use super::{InputsVec, RingDataset, TargetsVec};
use crate::{
  config::validate_split_percentages,
  error::{Result, RingError},
};

/// A view on one split of a shared dataset: the subset indices act as the sampler.
#[derive(Debug, Clone)]
pub struct DataLoader {
  dataset: Rc<RingDataset>,
  indices: Vec<usize>,
  batch_size: usize,
}

impl DataLoader {
  pub fn new(dataset: Rc<RingDataset>, indices: Vec<usize>, batch_size: usize) -> Result<Self> {
    if batch_size == 0 {
      return Err(RingError::configuration("batch size must be positive"));
    }
    if let Some(&bad) = indices.iter().find(|&&i| i >= dataset.len()) {
      return Err(RingError::shape_mismatch(format!(
        "sampler index {bad} is out of range for a dataset of {} samples",
        dataset.len()
      )));
    }
    Ok(Self {
      dataset,
      indices,
      batch_size,
    })
  }

  pub fn dataset(&self) -> &RingDataset {
    &self.dataset
  }

  /// The sampler indices into [`DataLoader::dataset`].
  pub fn indices(&self) -> &[usize] {
    &self.indices
  }

  /// Number of batches per epoch.
  pub fn len(&self) -> usize {
    self.indices.len().div_ceil(self.batch_size)
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  /// The whole split at once, in sampler order.
  pub fn subset(&self) -> (InputsVec, TargetsVec) {
    self.dataset.select(&self.indices)
  }

  /// Reshuffles the sampler and cuts it into batches of at most `batch_size`.
  pub fn batches<R: Rng>(&self, rng: &mut R) -> Vec<(InputsVec, TargetsVec)> {
    let mut order = self.indices.clone();
    order.shuffle(rng);
    order
      .chunks(self.batch_size)
      .map(|chunk| self.dataset.select(chunk))
      .collect()
  }
}

/// Train, dev and test loaders over the same dataset.
#[derive(Debug, Clone)]
pub struct SplitLoaders {
  pub train: DataLoader,
  pub dev: DataLoader,
  pub test: DataLoader,
}

impl SplitLoaders {
  pub fn gap(&self) -> f32 {
    self.train.dataset().gap()
  }
}

/// Subset sizes for `n` samples: train takes the first `p0 * n`, dev up to
/// `(p0 + p1) * n`, test the rest.
pub fn split_sizes(n: usize, percentages: &[f64]) -> Result<[usize; 3]> {
  validate_split_percentages(percentages)?;
  // guards against 0.29 * 100 = 28.999999999999996
  let boundary = |fraction: f64| ((fraction * n as f64 + 1e-9).floor() as usize).min(n);
  let max_train = boundary(percentages[0]);
  let max_dev = boundary(percentages[0] + percentages[1]).max(max_train);
  Ok([max_train, max_dev - max_train, n - max_dev])
}

/// Randomly partitions `dataset` into train, dev and test loaders.
pub fn split<R: Rng>(
  dataset: RingDataset,
  batch_size: usize,
  split_percentages: &[f64],
  rng: &mut R,
) -> Result<SplitLoaders> {
  let [train_no, dev_no, _] = split_sizes(dataset.len(), split_percentages)?;
  if train_no == 0 {
    return Err(RingError::configuration(format!(
      "split percentages {:?} leave no training samples out of {}",
      split_percentages,
      dataset.len()
    )));
  }

  let mut indices: Vec<usize> = (0..dataset.len()).collect();
  indices.shuffle(rng);
  let test_indices = indices.split_off(train_no + dev_no);
  let dev_indices = indices.split_off(train_no);
  debug!(
    "split sizes: train {}, dev {}, test {}",
    indices.len(),
    dev_indices.len(),
    test_indices.len()
  );

  let dataset = Rc::new(dataset);
  Ok(SplitLoaders {
    train: DataLoader::new(Rc::clone(&dataset), indices, batch_size)?,
    dev: DataLoader::new(Rc::clone(&dataset), dev_indices, batch_size)?,
    test: DataLoader::new(dataset, test_indices, batch_size)?,
  })
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use proptest::prelude::*;
  use rand::{rngs::StdRng, SeedableRng};

  use super::*;

  fn ring(n: usize) -> RingDataset {
    let mut rng = StdRng::seed_from_u64(11);
    RingDataset::generate(n, 0.4, None, &mut rng).unwrap()
  }

  #[test]
  fn sixty_twenty_twenty() {
    let mut rng = StdRng::seed_from_u64(0);
    let loaders = split(ring(100), 16, &[0.6, 0.2, 0.2], &mut rng).unwrap();
    assert_eq!(loaders.train.indices().len(), 60);
    assert_eq!(loaders.dev.indices().len(), 20);
    assert_eq!(loaders.test.indices().len(), 20);
    assert_eq!(loaders.train.len(), 4);
    assert_eq!(loaders.dev.len(), 2);

    let all: HashSet<usize> = [&loaders.train, &loaders.dev, &loaders.test]
      .iter()
      .flat_map(|l| l.indices().iter().copied())
      .collect();
    assert_eq!(all.len(), 100);
  }

  #[test]
  fn train_only_leaves_empty_loaders() {
    let mut rng = StdRng::seed_from_u64(0);
    let loaders = split(ring(50), 16, &[1.0, 0.0, 0.0], &mut rng).unwrap();
    assert_eq!(loaders.train.indices().len(), 50);
    assert!(loaders.dev.is_empty());
    assert!(loaders.test.is_empty());
    assert_eq!(loaders.dev.len(), 0);
  }

  #[test]
  fn too_small_train_share_is_rejected() {
    let mut rng = StdRng::seed_from_u64(0);
    let err = split(ring(4), 1, &[0.1, 0.45, 0.45], &mut rng).unwrap_err();
    assert!(matches!(err, RingError::Configuration(_)));
  }

  #[test]
  fn batches_cover_the_subset_once() {
    let mut rng = StdRng::seed_from_u64(2);
    let loaders = split(ring(30), 7, &[1.0, 0.0, 0.0], &mut rng).unwrap();
    let batches = loaders.train.batches(&mut rng);
    assert_eq!(batches.len(), loaders.train.len());
    assert!(batches.iter().all(|(x, y)| x.len() == y.len() && x.len() <= 7));
    assert_eq!(batches.iter().map(|(x, _)| x.len()).sum::<usize>(), 30);
  }

  proptest! {
    #[test]
    fn sizes_always_add_up(n in 0usize..2000, a in 1u32..100, b in 0u32..100, c in 0u32..100) {
      let total = (a + b + c) as f64;
      let percentages = [a as f64 / total, b as f64 / total, c as f64 / total];
      let sizes = split_sizes(n, &percentages).unwrap();
      prop_assert_eq!(sizes.iter().sum::<usize>(), n);
    }
  }
}
