//! arXiv research assistant CLI.
//!
//! Turns a research question into an arXiv search, reads the first pages of
//! the papers it finds, and asks a language model to answer from them.

mod commands;
mod event;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
