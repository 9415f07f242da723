//! EventFeed CLI: scrape a calendar site into an RSS feed.
//!
//! Queries the source calendar once per month, extracts event records from
//! whatever markup it finds, and writes a deduplicated feed plus a short
//! HTML summary page.

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
