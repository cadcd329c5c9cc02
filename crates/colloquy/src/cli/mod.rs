//! Command-line interface for the colloquy binary.

mod commands;
mod models;
mod run;

pub use commands::{Cli, Commands, RunArgs, WeightArg};
pub use models::list_models;
pub use run::run_batch;

use colloquy::{ColloquyResult, DispatchConfig};
use std::path::Path;

/// Explicit file if given, otherwise the layered defaults.
fn load_config(path: Option<&Path>) -> ColloquyResult<DispatchConfig> {
    match path {
        Some(path) => DispatchConfig::from_file(path),
        None => DispatchConfig::load(),
    }
}
