//! `sluice` -- operator CLI for rule-based message pipelines

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod trace_sink;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // `config validate` reports a broken file itself
    let config = match cli.command {
        Commands::Config(_) => commands::load_config(&cli.config)
            .await
            .unwrap_or_default(),
        _ => commands::load_config(&cli.config).await?,
    };
    logging::init_tracing(&config.general, cli.log_level.as_deref())?;

    tracing::debug!(config = %cli.config.display(), "sluice starting");

    let writer = OutputWriter::new(cli.output);
    match cli.command {
        Commands::Check(args) => commands::check::execute(args, &config, &writer).await?,
        Commands::Simulate(args) => commands::simulate::execute(args, &config, &writer).await?,
        Commands::Run(args) => commands::run::execute(args, &config, &writer).await?,
        Commands::Functions(args) => commands::functions::execute(args, &writer)?,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await?,
    }
    Ok(())
}
