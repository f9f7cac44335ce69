//! Plotsink CLI entry point

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use plotsink::commands::{run_env, run_list, run_send, run_serve, run_watch, CommandContext};
use plotsink::{Cli, Commands, IntakeError, PlotsinkConfig};

fn main() -> ExitCode {
    match run() {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<IntakeError>() {
                Some(intake) => intake.exit_code(),
                None => ExitCode::FAILURE,
            }
        }
    }
}

fn run() -> anyhow::Result<String> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging.level, cli.verbose)?;

    let ctx = CommandContext::new(cli.format, cli.verbose, config);
    let output = match &cli.command {
        Commands::Watch(args) => run_watch(args, &ctx)?,
        Commands::Serve(args) => run_serve(args, &ctx)?,
        Commands::List(args) => run_list(args, &ctx)?,
        Commands::Send(args) => run_send(args, &ctx)?,
        Commands::Env(args) => run_env(args, &ctx)?,
    };
    Ok(output)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PlotsinkConfig> {
    let config = match path {
        Some(path) => PlotsinkConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PlotsinkConfig::load()?,
    };
    Ok(config)
}

/// Logs go to stderr so stdout stays reserved for command output and events
fn init_tracing(level: &str, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { level };
    let directive = format!("plotsink={}", level)
        .parse::<Directive>()
        .with_context(|| format!("invalid log level: {}", level))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
