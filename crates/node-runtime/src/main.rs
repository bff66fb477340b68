//! # Validator Node
//!
//! ```text
//! node-runtime <config.toml>      # or VC_CONFIG=<config.toml> node-runtime
//! ```
//!
//! Runs until Ctrl+C, then stops the scheduler and peer server.

use anyhow::{Context, Result};
use node_runtime::config::config_path;
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path(std::env::args().skip(1), |key| std::env::var(key).ok())?;
    let config = NodeConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.node.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("===========================================");
    info!("  Validator Node v{}", env!("CARGO_PKG_VERSION"));
    info!("  Config: {}", path.display());
    info!("===========================================");

    let runtime = NodeRuntime::build(&config).await?;
    info!(address = %runtime.local_addr()?, "Listening for peers");
    let node = runtime.start();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    node.shutdown().await
}
