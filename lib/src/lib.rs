//! DNPU ring classification experiments.
//!
//! A surrogate network is trained to separate the inner disk from the outer
//! ring of a synthetic 2D dataset. Afterwards every split is scored, plotted
//! and written to a timestamped run directory.

pub mod algorithm;
pub mod config;
pub mod data;
pub mod error;
pub mod performance;
pub mod processor;
pub mod task;
pub mod utils;

pub use error::{Result, RingError};
pub use task::{ring_task, ExperimentResult, SplitResult};
