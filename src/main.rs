mod auth;
mod cleanup;
mod cli;
mod config;
mod error;
mod membership;
mod output;
mod providers;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting azdo-toolbox - Azure DevOps housekeeping");
    cli.execute().await
}
