mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("🚀 molweave CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(
            "Setting Rayon global thread pool to {} threads.",
            num_threads
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let command_result = async {
        let config = PartialConfig::load(cli.config.as_deref())?;
        match cli.command {
            Commands::Match(args) => {
                info!("Dispatching to 'match' command.");
                commands::match_atoms::run(args, &config).await
            }
            Commands::Align(args) => {
                info!("Dispatching to 'align' command.");
                commands::align::run(args, &config).await
            }
            Commands::Merge(args) => {
                info!("Dispatching to 'merge' command.");
                commands::merge::run(args, &config).await
            }
            Commands::Parameterise(args) => {
                info!("Dispatching to 'parameterise' command.");
                commands::parameterise::run(args, &config).await
            }
            Commands::Forcefields(args) => {
                info!("Dispatching to 'forcefields' command.");
                commands::forcefields::run(args).await
            }
        }
    }
    .await;

    match &command_result {
        Ok(_) => {
            info!("✅ Command completed successfully.");
            println!("✅ Command completed successfully.");
        }
        Err(e) => {
            error!("❌ Command failed: {}", e);
        }
    }

    command_result
}
