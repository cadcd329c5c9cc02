//! Colloquy CLI binary.
//!
//! - Dispatch a JSON Lines batch and write one result line per item
//! - List the resolved model profiles

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, list_models, run_batch};

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let logging = colloquy::ObservabilityConfig::new()
        .with_verbose(cli.verbose)
        .with_json_logs(cli.json_logs);
    colloquy::init_observability(&logging)?;

    match cli.command {
        Commands::Run(args) => {
            run_batch(args).await?;
        }
        Commands::Models { config } => {
            list_models(config.as_deref())?;
        }
    }

    Ok(())
}
