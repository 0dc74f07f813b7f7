//! blockfs CLI Binary
//!
//! Command-line interface for the simulated block file system.

use anyhow::Context;
use blockfs::logging::init_logging;
use blockfs::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = CliContext::new(cli.workspace.clone(), cli.config.clone(), cli.state.clone())
        .with_context(|| format!("initializing workspace {}", cli.workspace.display()))?
        .with_output_format(&cli.format)?;

    let logging = cli.logging_config(&context.config().logging);
    init_logging(Some(&logging)).context("initializing logging")?;

    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
