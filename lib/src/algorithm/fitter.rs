use std::{iter::zip, path::Path, time::Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::Criterion;
use crate::{
  data::DataLoader,
  error::{Result, RingError},
  processor::{Processor, Trainable},
  utils::serialize_to_file,
};

/// Best parameters seen during training, written to the save directory.
pub const MODEL_FILE: &str = "model.json";

/// Per-epoch loss history of the train and dev splits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performances {
  pub train: Vec<f32>,
  /// Empty when there is no dev split.
  pub dev: Vec<f32>,
}

/// Fits `model` for `epochs` passes over the train loader.
///
/// Every epoch reshuffles the train batches and takes one optimizer step per
/// sample. The train performance of an epoch is the mean loss of its steps,
/// the dev performance is the criterion on the whole dev split in eval mode.
/// Whenever the monitored loss (dev if present, train otherwise) improves,
/// the parameters are written to `save_dir/model.json`. The returned model
/// holds those best parameters, not the ones of the last epoch.
#[instrument(skip_all, fields(epochs = epochs))]
pub fn train<P: Trainable, R: Rng>(
  mut model: P,
  (train_loader, dev_loader): (&DataLoader, &DataLoader),
  epochs: usize,
  criterion: Criterion,
  rng: &mut R,
  save_dir: Option<&Path>,
) -> Result<(P, Performances)> {
  if train_loader.is_empty() {
    return Err(RingError::configuration("cannot train on an empty train split"));
  }

  let mut performances = Performances::default();
  let mut running_loss = ExponentialAverage::new(1.0);
  let mut best = f32::INFINITY;
  let mut best_parameters = None;
  let start = Instant::now();
  let mut iter = 0;

  for epoch in 0..epochs {
    model.set_train_mode();
    let mut epoch_loss = 0.0;
    let mut seen = 0;
    for (inputs, targets) in train_loader.batches(rng) {
      for (x, y) in zip(inputs.iter(), targets.iter()) {
        let loss = model.train_step(x, y);
        running_loss.update(loss);
        epoch_loss += loss;
        seen += 1;
        iter += 1;
      }
    }
    let train_loss = epoch_loss / seen as f32;
    performances.train.push(train_loss);

    let monitored = if dev_loader.is_empty() {
      train_loss
    } else {
      model.set_eval_mode();
      let (inputs, targets) = dev_loader.subset();
      let dev_loss = criterion.evaluate(&model.infer(&inputs), &targets)?;
      performances.dev.push(dev_loss);
      dev_loss
    };

    if monitored < best {
      best = monitored;
      let parameters = model.parameters();
      if let Some(dir) = save_dir {
        serialize_to_file(&dir.join(MODEL_FILE), &parameters)?;
        debug!("epoch {epoch}: new best loss {best:.6}, model saved");
      }
      best_parameters = Some(parameters);
    }
    debug!(
      "epoch {}/{}: train {:.6}, dev {:?}",
      epoch + 1,
      epochs,
      train_loss,
      performances.dev.last()
    );
  }

  if let Some(parameters) = best_parameters {
    model.load_parameters(&parameters)?;
  }
  if iter > 0 {
    info!(
      "Finished in {iter} iterations, running loss {:.6}, best monitored loss {best:.6}",
      running_loss.value
    );
    info!(
      "Took {:.2}s, {:.2}µs / iter",
      start.elapsed().as_secs_f32(),
      start.elapsed().as_micros() / iter
    );
  }
  Ok((model, performances))
}

/// Bias-corrected exponential moving average.
pub struct ExponentialAverage {
  beta: f32,
  moment: f32,
  pub value: f32,
  t: i32,
}

impl ExponentialAverage {
  pub fn new(initial: f32) -> Self {
    ExponentialAverage {
      beta: 0.999,
      moment: 0.,
      value: initial,
      t: 0,
    }
  }

  pub fn update(&mut self, value: f32) {
    self.t += 1;
    self.moment = self.beta * self.moment + (1. - self.beta) * value;
    // bias correction
    self.value = self.moment / (1. - f32::powi(self.beta, self.t));
  }
}
