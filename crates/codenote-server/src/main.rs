#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;

use anyhow::Context;
use codenote_core::http::HttpServer;
use codenote_core::services::ExpirySweeper;
use codenote_core::{AppCore, paths};
use config::{LogFormat, ServerConfig};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,codenote_server=debug,codenote_core=debug".into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("Failed to load server configuration")?;
    init_tracing(config.log_format);

    info!("Starting Codenote server");

    let db_path = match &config.db_path {
        Some(path) => path.clone(),
        None => paths::ensure_database_path().context("Failed to determine database path")?,
    };
    let core = Arc::new(
        AppCore::new(&db_path, config.retention()?).context("Failed to initialize app core")?,
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let sweeper = ExpirySweeper::new(core.entries.clone(), config.sweep_interval());
    let sweeper_task = tokio::spawn(sweeper.run(shutdown_tx.subscribe()));

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = signal_tx.send(());
            }
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let server = HttpServer::new(config.http_config(), core);
    let result = server.run(shutdown_tx.subscribe()).await;

    let _ = shutdown_tx.send(());
    if let Err(e) = sweeper_task.await {
        warn!(error = %e, "Expiry sweeper task ended abnormally");
    }

    result.context("HTTP server failed")?;
    info!("Codenote server stopped");
    Ok(())
}
