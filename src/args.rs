use clap::Parser;
use std::path::PathBuf;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "./chaos.config.json";

#[derive(Debug, Parser)]
#[command(
    name = "chaos",
    author,
    version,
    about = "Call programs with destructive inputs and record what breaks",
    long_about = "Reads a config file listing target programs with example inputs. Every \
                  input position is swapped, one at a time, for edge-case values (empty \
                  strings, NaN, Infinity, null, undefined, ...) and each call's output, \
                  timing and return-type match is reported."
)]
pub struct Args {
    /// Config file (`.json`, or `.yaml`/`.yml`).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Output as JSON instead of human-readable tables
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Log filter in `RUST_LOG` syntax, written to stderr.
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    pub log: String,

    /// Only run the named target. Can be provided multiple times.
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,
}
