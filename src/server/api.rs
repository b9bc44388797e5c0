//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, state::AppState};

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/predict", post(handlers::predict))
        .fallback(handlers::handle_404)
        .method_not_allowed_fallback(handlers::handle_405)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
