use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

// GET /test
pub async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        message: "Server is working!",
        timestamp: Utc::now(),
    })
}
