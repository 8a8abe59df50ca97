pub mod entries;
pub mod system;

use axum::{
    Router,
    routing::{get, post, put},
};

/// Build the API router with all entry routes
pub fn router() -> Router {
    Router::new()
        .route("/check-code/{code}", get(entries::check_code))
        .route("/retrieve/{code}", get(entries::retrieve))
        .route("/update/{code}", put(entries::update))
        .route("/save-text", post(entries::save_text))
        .route("/save-code", post(entries::save_code))
        .route("/results", get(entries::results))
        .route("/test", get(system::liveness))
}
