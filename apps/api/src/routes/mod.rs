pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Uploads are unbounded unless UPLOAD_LIMIT_BYTES is set.
    let body_limit = match state.config.upload_limit_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analyse", post(handlers::handle_analyse))
        .route("/api/v1/extract", post(handlers::handle_extract))
        .layer(body_limit)
        .with_state(state)
}
