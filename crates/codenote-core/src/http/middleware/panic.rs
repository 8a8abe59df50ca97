use axum::response::{IntoResponse, Response};
use std::any::Any;

use crate::http::ApiError;

/// Turn a panicking handler into a JSON 500 instead of a dropped connection.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Unhandled error in request handler");

    ApiError::internal().into_response()
}
