use crate::AppCore;
use anyhow::Result;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use super::router;

/// Request bodies larger than this are rejected.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port to listen on (default: 3000)
    pub port: u16,
    /// CORS allowed origins; empty or "*" allows any
    pub cors_origins: Vec<String>,
    /// Directory of client assets served for unmatched paths
    pub static_dir: Option<PathBuf>,
    /// Maximum request body size in bytes
    pub body_limit_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            static_dir: None,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

/// HTTP server for the entry API
pub struct HttpServer {
    config: HttpConfig,
    core: Arc<AppCore>,
}

impl HttpServer {
    pub fn new(config: HttpConfig, core: Arc<AppCore>) -> Self {
        Self { config, core }
    }

    /// Build the router with all API routes
    fn build_router(&self) -> Router {
        router::build_router(self.core.clone(), &self.config)
    }

    /// Run the HTTP server until the shutdown signal fires
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let app = self.build_router();
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}
