use crate::AppCore;
use axum::{Extension, Router, extract::DefaultBodyLimit, routing::get};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;

use super::{HttpConfig, api, middleware};

pub fn build_router(core: Arc<AppCore>, config: &HttpConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .merge(api::router());

    if let Some(dir) = config.static_dir.as_ref().filter(|dir| dir.exists()) {
        app = app.fallback_service(ServeDir::new(dir));
    }

    with_layers(app, core, config)
}

fn with_layers(app: Router, core: Arc<AppCore>, config: &HttpConfig) -> Router {
    app.layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(axum::middleware::from_fn(middleware::request_log::log_request))
        .layer(CatchPanicLayer::custom(middleware::panic::handle_panic))
        .layer(middleware::cors::build_cors_layer(config))
        .layer(Extension(core))
}

async fn health_check() -> &'static str {
    "OK"
}
