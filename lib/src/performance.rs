//! Classification metrics over one-dimensional model outputs.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
  data::{is_class_one, Target},
  error::{Result, RingError},
};

/// A single-input linear classifier fitted to model outputs.
///
/// A sample is predicted as class 1 when `weight * output + bias > 0`, i.e.
/// above `threshold` for `weight = 1` and below it for `weight = -1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptronResult {
  /// Fraction of samples whose predicted label matches the target, in [0, 1].
  pub accuracy_value: f32,
  pub threshold: f32,
  pub weight: f32,
  pub bias: f32,
  /// 0.0 or 1.0 per sample, in input order.
  pub predicted_labels: Vec<f32>,
}

fn check_lengths(outputs: usize, targets: usize) -> Result<()> {
  if outputs != targets {
    return Err(RingError::shape_mismatch(format!(
      "{outputs} outputs for {targets} targets"
    )));
  }
  if outputs == 0 {
    return Err(RingError::shape_mismatch("no samples to score"));
  }
  Ok(())
}

/// Finds the threshold on `outputs` that best separates the two classes.
///
/// Every boundary between distinct output values is tried in both
/// orientations, so the result is the optimum over all 1D decision rules. On
/// ties the lowest threshold wins, and "class 1 above" beats "class 1 below".
/// The result only depends on the multiset of (output, target) pairs.
pub fn perceptron(outputs: &[f32], targets: &[Target]) -> Result<PerceptronResult> {
  check_lengths(outputs.len(), targets.len())?;
  let n = outputs.len();

  let mut order: Vec<usize> = (0..n).collect();
  order.sort_by(|&a, &b| outputs[a].total_cmp(&outputs[b]));
  let sorted: Vec<f32> = order.iter().map(|&i| outputs[i]).collect();
  let ones_total = targets.iter().filter(|t| is_class_one(t)).count();
  let zeros_total = n - ones_total;

  // (correct, split index, weight)
  let mut best: (usize, usize, f32) = (0, 0, 1.0);
  let mut seen = false;
  let (mut ones_below, mut zeros_below) = (0, 0);
  for k in 0..=n {
    if k > 0 {
      if is_class_one(&targets[order[k - 1]]) {
        ones_below += 1;
      } else {
        zeros_below += 1;
      }
    }
    if k > 0 && k < n && sorted[k - 1].total_cmp(&sorted[k]) == Ordering::Equal {
      continue;
    }
    let above = zeros_below + (ones_total - ones_below);
    let below = ones_below + (zeros_total - zeros_below);
    for (correct, weight) in [(above, 1.0), (below, -1.0)] {
      if !seen || correct > best.0 {
        best = (correct, k, weight);
        seen = true;
      }
    }
  }

  let (_, k, weight) = best;
  let threshold = split_threshold(&sorted, k, weight);
  let bias = -weight * threshold;
  let predicted_labels: Vec<f32> = outputs
    .iter()
    .map(|&o| if weight * o + bias > 0.0 { 1.0 } else { 0.0 })
    .collect();
  let correct = predicted_labels
    .iter()
    .zip(targets)
    .filter(|(label, t)| (**label >= 0.5) == is_class_one(t))
    .count();

  Ok(PerceptronResult {
    accuracy_value: correct as f32 / n as f32,
    threshold,
    weight,
    bias,
    predicted_labels,
  })
}

/// Threshold between `sorted[k - 1]` and `sorted[k]`, or just outside the range at the ends.
fn split_threshold(sorted: &[f32], k: usize, weight: f32) -> f32 {
  let margin = |v: f32| 1.0_f32.max(v.abs());
  match k {
    0 => sorted[0] - margin(sorted[0]),
    k if k == sorted.len() => sorted[k - 1] + margin(sorted[k - 1]),
    k => {
      let (lo, hi) = (sorted[k - 1], sorted[k]);
      let mid = ((f64::from(lo) + f64::from(hi)) / 2.0) as f32;
      if lo < mid && mid < hi {
        mid
      } else if weight > 0.0 {
        // adjacent floats: the strict comparison keeps `lo` on the lower side
        lo
      } else {
        hi
      }
    }
  }
}

/// Pearson correlation coefficient of `x` and `y`.
///
/// Returns 0.0 when either side has no variance.
pub fn corr_coeff(x: &[f32], y: &[f32]) -> Result<f32> {
  check_lengths(x.len(), y.len())?;
  let n = x.len() as f64;
  let mean_x = x.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
  let mean_y = y.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

  let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
  for (&a, &b) in x.iter().zip(y) {
    let dx = f64::from(a) - mean_x;
    let dy = f64::from(b) - mean_y;
    cov += dx * dy;
    var_x += dx * dx;
    var_y += dy * dy;
  }
  if var_x <= 0.0 || var_y <= 0.0 {
    return Ok(0.0);
  }
  Ok((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0) as f32)
}

/// Correlation between outputs and the class component of the targets.
pub fn target_correlation(outputs: &[f32], targets: &[Target]) -> Result<f32> {
  let labels: Vec<f32> = targets.iter().map(|t| t[0]).collect();
  corr_coeff(outputs, &labels)
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  #[test]
  fn separable_outputs_are_fully_accurate() {
    let targets = [[0.0], [1.0], [0.0], [1.0]];
    let result = perceptron(&[0.1, 0.9, 0.2, 0.8], &targets).unwrap();
    assert_eq!(result.accuracy_value, 1.0);
    assert_eq!(result.weight, 1.0);
    assert!((result.threshold - 0.5).abs() < 1e-6);
    assert_eq!(result.predicted_labels, vec![0.0, 1.0, 0.0, 1.0]);
  }

  #[test]
  fn inverted_outputs_flip_the_weight() {
    let targets = [[1.0], [0.0], [1.0], [0.0]];
    let result = perceptron(&[0.1, 0.9, 0.2, 0.8], &targets).unwrap();
    assert_eq!(result.accuracy_value, 1.0);
    assert_eq!(result.weight, -1.0);
    assert_eq!(result.predicted_labels, vec![1.0, 0.0, 1.0, 0.0]);
  }

  #[test]
  fn constant_outputs_predict_the_majority() {
    let targets = [[1.0], [1.0], [0.0]];
    let result = perceptron(&[0.3, 0.3, 0.3], &targets).unwrap();
    assert!((result.accuracy_value - 2.0 / 3.0).abs() < 1e-6);
    assert_eq!(result.predicted_labels, vec![1.0, 1.0, 1.0]);
  }

  #[test]
  fn empty_or_mismatched_input_is_rejected() {
    assert!(perceptron(&[], &[]).is_err());
    assert!(perceptron(&[0.1], &[[0.0], [1.0]]).is_err());
    assert!(corr_coeff(&[1.0, 2.0], &[1.0]).is_err());
  }

  #[test]
  fn correlation_of_linear_relations() {
    let x = [1.0, 2.0, 3.0, 4.0];
    assert!((corr_coeff(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-6);
    assert!((corr_coeff(&x, &[-1.0, -2.0, -3.0, -4.0]).unwrap() + 1.0).abs() < 1e-6);
    assert_eq!(corr_coeff(&x, &[5.0; 4]).unwrap(), 0.0);
  }

  fn scored_samples() -> impl Strategy<Value = Vec<(f32, bool)>> {
    prop::collection::vec((-10.0f32..10.0, any::<bool>()), 1..60)
  }

  fn unzip(samples: &[(f32, bool)]) -> (Vec<f32>, Vec<Target>) {
    samples
      .iter()
      .map(|&(o, c)| (o, [if c { 1.0 } else { 0.0 }]))
      .unzip()
  }

  proptest! {
    #[test]
    fn metrics_stay_in_range(samples in scored_samples()) {
      let (outputs, targets) = unzip(&samples);
      let result = perceptron(&outputs, &targets).unwrap();
      prop_assert!((0.5..=1.0).contains(&result.accuracy_value));
      prop_assert_eq!(result.predicted_labels.len(), outputs.len());
      let corr = target_correlation(&outputs, &targets).unwrap();
      prop_assert!((-1.0..=1.0).contains(&corr));
    }

    #[test]
    fn metrics_ignore_sample_order(samples in scored_samples(), seed in any::<u64>()) {
      use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

      let mut shuffled = samples.clone();
      shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
      let (outputs, targets) = unzip(&samples);
      let (outputs_s, targets_s) = unzip(&shuffled);

      let a = perceptron(&outputs, &targets).unwrap();
      let b = perceptron(&outputs_s, &targets_s).unwrap();
      prop_assert_eq!(a.accuracy_value, b.accuracy_value);
      prop_assert_eq!(a.threshold, b.threshold);
      prop_assert_eq!(a.weight, b.weight);

      let ca = target_correlation(&outputs, &targets).unwrap();
      let cb = target_correlation(&outputs_s, &targets_s).unwrap();
      prop_assert!((ca - cb).abs() < 1e-4);
    }
  }
}
