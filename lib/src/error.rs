use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RingError>;

/// Everything that can abort a ring experiment run. Nothing is retried.
#[derive(Debug, Error)]
pub enum RingError {
  /// Malformed or missing configuration, including unusable dataset directories.
  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("filesystem error at {}: {source}", path.display())]
  Filesystem {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Inputs, targets and predictions disagree in length.
  #[error("shape mismatch: {0}")]
  ShapeMismatch(String),

  #[error("results for the {0} split were never computed")]
  MissingSplit(&'static str),

  #[error("serialization error: {0}")]
  Serialization(String),

  #[error("plotting error: {0}")]
  Plot(String),
}

impl RingError {
  pub fn configuration(reason: impl Into<String>) -> Self {
    Self::Configuration(reason.into())
  }

  pub fn shape_mismatch(reason: impl Into<String>) -> Self {
    Self::ShapeMismatch(reason.into())
  }

  /// Wraps an io error together with the path it happened on.
  pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Filesystem {
      path: path.into(),
      source,
    }
  }
}

impl From<serde_yaml::Error> for RingError {
  fn from(err: serde_yaml::Error) -> Self {
    Self::Serialization(err.to_string())
  }
}

impl From<serde_json::Error> for RingError {
  fn from(err: serde_json::Error) -> Self {
    Self::Serialization(err.to_string())
  }
}

impl From<bincode::Error> for RingError {
  fn from(err: bincode::Error) -> Self {
    Self::Serialization(err.to_string())
  }
}
