use luminal::prelude::*;
use luminal_nn::{Linear, ReLU};
use luminal_training::{mse_loss, sgd_on_graph, Autograd};
use tracing::{debug, instrument};

use super::{check_parameters, Architecture, Processor, Trainable};
use crate::{
  algorithm::{Optimizer, OptimizerKind},
  config::ProcessorConfig,
  data::{Sample, Target, INPUT_DIMENSION, TARGET_DIMENSION},
  error::Result,
};

pub type SmallModel = (Linear<INPUT_DIMENSION, 16>, ReLU, Linear<16, 1>);
pub type MediumModel = (
  Linear<INPUT_DIMENSION, 32>,
  ReLU,
  Linear<32, 16>,
  ReLU,
  Linear<16, 1>,
);

/// Neural network surrogate of a DNPU, compiled once into a luminal graph
/// holding the forward pass, the MSE loss, its gradients and the SGD update.
///
/// Running the graph always computes the updated weights; they are only
/// copied over the live weights in train mode, so evaluation never changes
/// the parameters.
pub struct DnpuSurrogate {
  // boxed: the tensor handles below point into the graph
  cx: Box<Graph>,
  input: GraphTensor<R1<INPUT_DIMENSION>>,
  target: GraphTensor<R1<TARGET_DIMENSION>>,
  output: GraphTensor<R1<1>>,
  loss: GraphTensor<R0>,
  weights: Vec<NodeIndex>,
  new_weights: Vec<NodeIndex>,
  training: bool,
}

impl DnpuSurrogate {
  #[instrument(skip_all, fields(architecture = ?config.architecture))]
  pub fn new(config: &ProcessorConfig, optimizer: &Optimizer) -> Result<Self> {
    let mut cx = Box::new(Graph::new());
    let surrogate = match config.architecture {
      Architecture::Small => {
        let model = <SmallModel>::initialize(&mut cx);
        let input = cx.tensor::<R1<INPUT_DIMENSION>>();
        let output = model.forward(input).retrieve();
        let weights = params(&model);
        Self::assemble(cx, input, output, weights, optimizer)
      }
      Architecture::Medium => {
        let model = <MediumModel>::initialize(&mut cx);
        let input = cx.tensor::<R1<INPUT_DIMENSION>>();
        let output = model.forward(input).retrieve();
        let weights = params(&model);
        Self::assemble(cx, input, output, weights, optimizer)
      }
    };
    debug!("surrogate graph holds {} weight tensors", surrogate.weights.len());
    Ok(surrogate)
  }

  fn assemble(
    mut cx: Box<Graph>,
    input: GraphTensor<R1<INPUT_DIMENSION>>,
    output: GraphTensor<R1<1>>,
    weights: Vec<NodeIndex>,
    optimizer: &Optimizer,
  ) -> Self {
    let target = cx.tensor::<R1<TARGET_DIMENSION>>();
    let loss = mse_loss(output, target).retrieve();

    let grads = cx.compile(Autograd::new(&weights, loss), ());
    let new_weights = match optimizer.kind {
      OptimizerKind::Sgd => {
        let (new_weights, lr) = sgd_on_graph(&mut cx, &weights, &grads);
        lr.set(optimizer.learning_rate);
        new_weights
      }
    };
    cx.keep_tensors(&new_weights);
    cx.keep_tensors(&weights);

    Self {
      cx,
      input,
      target,
      output,
      loss,
      weights,
      new_weights,
      training: true,
    }
  }

  fn run(&mut self, input: &Sample, target: &Target) -> (f32, f32) {
    self.input.set(*input);
    self.target.set(*target);
    self.cx.execute();
    if self.training {
      transfer_data_same_graph(&self.new_weights, &self.weights, self.cx.as_mut());
    }
    let prediction = self.output.data()[0];
    let loss = self.loss.data()[0];
    self.output.drop();
    self.loss.drop();
    (prediction, loss)
  }
}

impl Processor for DnpuSurrogate {
  fn infer(&mut self, inputs: &[Sample]) -> Vec<f32> {
    // the target only feeds the loss, whose value is discarded here
    let placeholder: Target = [0.0; TARGET_DIMENSION];
    let training = std::mem::replace(&mut self.training, false);
    let predictions = inputs.iter().map(|x| self.run(x, &placeholder).0).collect();
    self.training = training;
    predictions
  }

  /// Empty vectors until the graph has been executed once.
  fn parameters(&self) -> Vec<Vec<f32>> {
    self
      .weights
      .iter()
      .map(|id| {
        self
          .cx
          .tensors
          .get(&(*id, 0 /* single output */))
          .and_then(|val| val.downcast_ref::<Vec<f32>>())
          .cloned()
          .unwrap_or_default()
      })
      .collect()
  }

  /// Replaces both the live weight tensors and the ops that produce them, so
  /// the loaded values survive a graph that has not been executed yet.
  fn load_parameters(&mut self, parameters: &[Vec<f32>]) -> Result<()> {
    check_parameters(&self.parameters(), parameters)?;
    for (id, values) in self.weights.iter().zip(parameters) {
      let op_values = values.clone();
      self.cx.get_op_mut::<Function>(*id).1 =
        Box::new(move |_| vec![Tensor::new(op_values.clone())]);
      self.cx.tensors.insert((*id, 0), Tensor::new(values.clone()));
    }
    Ok(())
  }

  fn set_eval_mode(&mut self) {
    self.training = false;
  }

  fn set_train_mode(&mut self) {
    self.training = true;
  }

  fn is_training(&self) -> bool {
    self.training
  }
}

impl Trainable for DnpuSurrogate {
  fn train_step(&mut self, input: &Sample, target: &Target) -> f32 {
    self.run(input, target).1
  }
}
