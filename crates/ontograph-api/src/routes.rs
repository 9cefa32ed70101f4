//! API route definitions

use crate::handlers::{graph, health};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-graph", post(graph::generate_graph))
        .route("/metrics", get(health::metrics))
}
