use std::{
  fs::File,
  io::{BufReader, BufWriter, Write},
  path::{Path, PathBuf},
};

use bincode::Options;
use chrono::Local;
#[cfg(not(debug_assertions))]
use human_panic::setup_panic;
use serde::{de::DeserializeOwned, Serialize};
use tracing::subscriber::{DefaultGuard, SetGlobalDefaultError};

#[cfg(debug_assertions)]
extern crate better_panic;

use crate::error::{Result, RingError};

const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H%M%S";

// [NOTE] tracing
//
// In code use:
//
// use tracing::{trace, debug, info, warn, error, instrument};
//
// `#[tracing::instrument]` opens a span named after the function each time it
// is called; arguments become span fields unless skipped.

pub fn install_logger() -> std::result::Result<(), SetGlobalDefaultError> {
  let subscriber = tracing_subscriber::fmt().compact();

  #[cfg(debug_assertions)]
  let subscriber = subscriber.with_max_level(tracing::Level::DEBUG);

  let subscriber = subscriber.finish();
  tracing::subscriber::set_global_default(subscriber)
}

pub fn init_logging() -> std::result::Result<(), SetGlobalDefaultError> {
  // Human Panic. Only enabled when *not* debugging.
  #[cfg(not(debug_assertions))]
  {
    setup_panic!();
  }

  // Better Panic. Only enabled *when* debugging.
  #[cfg(debug_assertions)]
  {
    better_panic::Settings::debug()
      .most_recent_first(false)
      .lineno_suffix(true)
      .verbosity(better_panic::Verbosity::Full)
      .install();
  }

  // Setup Logging
  install_logger()?;

  Ok(())
}

/// Thread-local subscriber for tests; logging stops when the guard is dropped.
pub fn init_logging_tests() -> DefaultGuard {
  let subscriber = tracing_subscriber::fmt()
    .compact()
    .with_test_writer()
    .with_max_level(tracing::Level::DEBUG)
    .finish();
  tracing::subscriber::set_default(subscriber)
}

/// Creates `path` and its parents; an existing directory is fine.
pub fn create_directory(path: &Path) -> Result<()> {
  std::fs::create_dir_all(path).map_err(|e| RingError::filesystem(path, e))
}

/// Creates `<parent>/<name>_<timestamp>`, appending `_1`, `_2`, ... while the name is taken.
pub fn create_directory_timestamp(parent: &Path, name: &str) -> Result<PathBuf> {
  create_directory(parent)?;
  let stem = format!("{}_{}", name, Local::now().format(TIMESTAMP_FORMAT));
  let mut candidate = parent.join(&stem);
  let mut suffix = 0;
  loop {
    match std::fs::create_dir(&candidate) {
      Ok(()) => return Ok(candidate),
      Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
        suffix += 1;
        candidate = parent.join(format!("{stem}_{suffix}"));
      }
      Err(e) => return Err(RingError::filesystem(candidate, e)),
    }
  }
}

pub fn serialize_to_file<T: Serialize>(path: &Path, obj: &T) -> Result<()> {
  let buff = serde_json::to_string(obj)?;
  std::fs::write(path, buff).map_err(|e| RingError::filesystem(path, e))
}

pub fn deserialize_from_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let content = std::fs::read_to_string(path).map_err(|e| RingError::filesystem(path, e))?;
  Ok(serde_json::from_str(&content)?)
}

/// Fixed-width little-endian codec for result blobs.
fn codec() -> impl Options {
  bincode::DefaultOptions::new()
    .with_fixint_encoding()
    .with_little_endian()
}

pub fn save_binary<T: Serialize>(path: &Path, obj: &T) -> Result<()> {
  let file = File::create(path).map_err(|e| RingError::filesystem(path, e))?;
  let mut writer = BufWriter::new(file);
  codec().serialize_into(&mut writer, obj)?;
  writer.flush().map_err(|e| RingError::filesystem(path, e))
}

pub fn load_binary<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let file = File::open(path).map_err(|e| RingError::filesystem(path, e))?;
  Ok(codec().deserialize_from(BufReader::new(file))?)
}
