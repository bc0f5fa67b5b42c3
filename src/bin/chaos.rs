//! chaos: call programs with destructive inputs and record what breaks
//!
//! Reads `chaos.config.json` (or the file given with `--config`), runs every
//! target through the engine and prints one result table per target.
//!
//! ## Example Usage
//!
//! ```bash
//! # Run every target in ./chaos.config.json
//! chaos
//!
//! # Run one target from a YAML config, as JSON
//! chaos --config ci/chaos.yaml --only sum --json
//!
//! # Show generation and probing details
//! chaos --log debug
//! ```
//!
//! Exit status: `0` when every target ran cleanly, `1` when a target failed
//! or reported errors, `2` when the config could not be loaded.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chaos_engine::args::Args;
use chaos_engine::config::{config_dir, ChaosConfig};
use chaos_engine::{output, runner};

const CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log))
        .with_writer(std::io::stderr)
        .init();

    let config = match ChaosConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::from(CONFIG_ERROR);
        }
    };
    let targets = match config.select(&args.only) {
        Ok(targets) => targets,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::from(CONFIG_ERROR);
        }
    };

    let base_dir = config_dir(&args.config);
    let outcomes = runner::run_targets(&config, &base_dir, &targets).await;

    if args.json {
        println!("{}", output::format_outcomes_json(&outcomes));
    } else {
        for outcome in &outcomes {
            print!("{}", output::format_outcome(outcome));
        }
    }

    ExitCode::from(runner::exit_code(&outcomes))
}
