//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use super::handlers::{
    calculate, get_config, graph, health, index, render_metrics, set_config, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let assets = ServeDir::new(state.static_dir.as_path());

    Router::new()
        // Computation endpoints
        .route("/api/calculate", post(calculate))
        .route("/api/graph", post(graph))
        // Legacy config endpoints
        .route("/api/config", get(get_config).post(set_config))
        // Health and metrics
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        // Frontend
        .route("/", get(index))
        .nest_service("/static", assets)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
