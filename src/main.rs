//! Binary entry point for the fleetssh CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fleetssh::{
    AwsCli, ConfigError, Discoverer, Executor, Filter, FleetConfig, NodeKind, Pipeline,
    ProcessJobRunner, RunError, RunOrchestrator,
};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("a query is required unless --list-nodes is given")]
    MissingQuery,
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

const fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    if cli.list_nodes {
        write_node_names(io::stdout().lock())?;
        return Ok(0);
    }

    let config = resolve_config(&cli)?;
    let Some(query) = cli.query else {
        return Err(CliError::MissingQuery);
    };

    let pipeline = Pipeline::from_config(&config)?;
    let orchestrator = RunOrchestrator::new(
        pipeline,
        AwsCli::with_process_runner(config.aws_bin),
        ProcessJobRunner,
    );
    let summary = orchestrator.execute(&query, &cli.command).await?;
    debug!(jobs = summary.outcomes.len(), "run finished");
    Ok(summary.exit_code())
}

/// Merges configuration sources with command-line overrides.
fn resolve_config(cli: &Cli) -> Result<FleetConfig, CliError> {
    let mut config = FleetConfig::load_without_cli_args()?;
    apply_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut FleetConfig, cli: &Cli) {
    if let Some(discoverer) = &cli.discoverer {
        config.discoverer.clone_from(discoverer);
    }
    if let Some(filter) = &cli.filter {
        config.filter.clone_from(filter);
    }
    if let Some(executor) = &cli.executor {
        config.executor.clone_from(executor);
    }
}

fn write_node_names(mut out: impl Write) -> io::Result<()> {
    write_kind::<Discoverer>(&mut out)?;
    write_kind::<Filter>(&mut out)?;
    write_kind::<Executor>(&mut out)
}

fn write_kind<N: NodeKind>(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}s:", N::KIND)?;
    for name in N::names() {
        writeln!(out, "  {name}")?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "fleetssh: {err}").ok();
}
