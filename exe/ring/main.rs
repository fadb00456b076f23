use std::{error::Error, path::Path};

use clap::Parser;
use dnpu_ring::{
  config::load_configs,
  data::{get_ring_data, VoltageRange},
  processor::DnpuSurrogate,
  ring_task, utils,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

const CONFIG_PATH: &str = "configs/ring.yaml";

/// Trains a DNPU surrogate on the ring task and scores, plots and saves the result.
///
/// All parameters are read from configs/ring.yaml.
#[derive(Parser)]
#[command(version, about)]
struct Cli {}

fn main() -> Result<(), Box<dyn Error>> {
  utils::init_logging()?;
  let _args = Cli::parse();

  let configs = load_configs(Path::new(CONFIG_PATH))?;
  let mut rng = match configs.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };
  let transform = VoltageRange::from(configs.data.voltage_range);
  let loaders = get_ring_data(
    configs.data.gap,
    &configs,
    Some(transform),
    configs.data.data_dir.as_deref(),
    &mut rng,
  )?;

  let results = ring_task(&loaders, DnpuSurrogate::new, &configs, true, &mut rng)?;
  info!(
    "Train accuracy {:.2}%",
    results.train_results.accuracy.accuracy_value * 100.0
  );
  Ok(())
}
