//! Seedgrid CLI Binary

use anyhow::Context;
use clap::Parser;
use seedgrid::logging::init_logging;
use seedgrid::tooling::cli::{Cli, CliContext};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let context =
        CliContext::new(cli.config.clone()).context("Failed to initialize seedgrid")?;

    let logging = cli.logging_config(&context.config().logging);
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let output = context.execute(&cli.command)?;
    println!("{}", output);
    Ok(())
}
