//! Assay CLI - data-quality scoring and workflow runner.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Score {
            catalog,
            dataset,
            rules,
            weights,
            json,
            record,
        } => commands::score::run(
            commands::score::ScoreArgs {
                catalog,
                dataset,
                rules,
                weights,
                json,
                record,
            },
            cli.config.as_deref(),
        ),

        Commands::Run {
            catalog,
            project,
            workflow,
            output_dir,
            json,
            record,
        } => commands::run::run(
            commands::run::RunArgs {
                catalog,
                project,
                workflow,
                output_dir,
                json,
                record,
            },
            cli.config.as_deref(),
        ),

        Commands::Describe { file, json } => commands::describe::run(file, json),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
