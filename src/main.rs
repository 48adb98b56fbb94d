// pageclone: capture a rendered page and its assets for offline browsing.
//
// Logging follows RUST_LOG and defaults to `pageclone=info`.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pageclone::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pageclone=info")))
        .with_target(true)
        .init();

    let config = Cli::parse().into_config()?;
    let summary = pageclone::capture(config).await?;

    tracing::info!(
        target: "pageclone::capture",
        "Saved {} ({} assets) from {}",
        summary.index_path.display(),
        summary.assets_captured,
        summary.final_url
    );
    Ok(())
}
