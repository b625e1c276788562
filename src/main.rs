//! netsense - Main entry point

use clap::Parser;
use netsense::cli::{cmd_generate, cmd_info, cmd_monitor, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netsense=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            samples,
            ratio,
            estimators,
            subsample,
            contamination,
            seed,
            output,
        } => {
            cmd_train(samples, ratio, estimators, subsample, contamination, seed, &output)?;
        }
        Commands::Generate {
            samples,
            ratio,
            seed,
            output,
        } => {
            cmd_generate(samples, ratio, seed, &output)?;
        }
        Commands::Monitor {
            model,
            ticks,
            interval_ms,
            seed,
        } => {
            cmd_monitor(&model, ticks, interval_ms, seed)?;
        }
        Commands::Info { model } => {
            cmd_info(&model)?;
        }
    }

    Ok(())
}
