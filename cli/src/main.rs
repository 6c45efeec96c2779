mod cli;
mod config;
mod logging;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use cli::Cli;
use config::IndexerConfig;
use std::sync::Arc;
use tindex_core::TemplateIndex;
use tindex_core::register_ledgers;
use tindex_sync::Reconciler;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = IndexerConfig::resolve(&cli)?;
    logging::init(config.develmode);

    info!("template-indexer {} starting", env!("CARGO_PKG_VERSION"));
    debug!(?config, "effective configuration");
    run(config).await
}

async fn run(config: IndexerConfig) -> Result<()> {
    let index = Arc::new(TemplateIndex::new());
    register_ledgers(&index, &config.ledgers, &config.conf_dir);

    let reconciler = Reconciler::new(Arc::clone(&index), config.update_semantics);
    let rx = reconciler
        .follow(
            &config.source_dir,
            config.namespace.as_deref(),
            config.sync_on_startup,
        )
        .with_context(|| {
            format!(
                "initial sync from {} failed",
                config.source_dir.display()
            )
        })?;
    info!(semantics = %reconciler.semantics(), "applying template changes");
    tokio::spawn(async move {
        if let Err(err) = reconciler.run(rx).await {
            warn!("template updates stopped: {err}");
        }
    });

    tindex_daemon::serve(config.listen_addr(), index, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
