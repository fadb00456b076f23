use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
  error::Result,
  utils::{create_directory, create_directory_timestamp},
};

pub const MAIN_DIR: &str = "ring_classification";
pub const REPRODUCIBILITY_DIR: &str = "reproducibility";
pub const RESULTS_DIR: &str = "results";

/// Output locations of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirs {
  pub main_dir: PathBuf,
  pub results_dir: PathBuf,
  pub reproducibility_dir: PathBuf,
}

/// Prepares `base_dir/gap_<gap>` for a run.
///
/// A main run gets a fresh timestamped directory below it; otherwise the gap
/// directory itself is reused and nothing already in it is touched.
pub fn init_dirs(gap: &str, base_dir: &Path, is_main: bool) -> Result<RunDirs> {
  let gap_dir = base_dir.join(format!("gap_{gap}"));
  let main_dir = if is_main {
    create_directory_timestamp(&gap_dir, MAIN_DIR)?
  } else {
    gap_dir
  };
  let reproducibility_dir = main_dir.join(REPRODUCIBILITY_DIR);
  let results_dir = main_dir.join(RESULTS_DIR);
  create_directory(&reproducibility_dir)?;
  create_directory(&results_dir)?;
  debug!("run directory: {}", main_dir.display());
  Ok(RunDirs {
    main_dir,
    results_dir,
    reproducibility_dir,
  })
}
