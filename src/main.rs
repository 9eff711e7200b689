mod agent;
mod artifacts;
mod cli;
mod config;
mod error;
mod output;
mod triage;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting citriage - CI failure triage");
    cli.execute().await?;

    Ok(())
}
