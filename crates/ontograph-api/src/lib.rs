//! ontograph API - HTTP server
//!
//! Exposes knowledge graph generation over multipart upload. The web
//! frontend's `/generate-graph/` path is served alongside `/api/v1`.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

pub use error::{ApiError, AppError};
pub use service::{generate, GenerateError, GenerateRequest, GraphOutput};
pub use state::{AppState, LlmFactory};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Build the application router with its middleware stack
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;

    let mut router = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/generate-graph/", post(handlers::graph::generate_graph))
        .nest("/api/v1", routes::api_routes())
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    if server.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
