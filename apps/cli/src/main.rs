//! embedplot CLI: checksum-gated ingest of protein embeddings into plot data.
//!
//! Downloads the published embedding archive, and when it has changed,
//! annotates every entry with keywords, projects the embeddings to 2-D,
//! and publishes the result as JSON.

mod commands;

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
