//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS and request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/turn", post(handlers::turn::post_turn))
        .route("/turn/stream", post(handlers::turn::stream_turn))
        .route("/sites/{id}", get(handlers::site::get_site))
        .route("/sites/{id}/snapshots", get(handlers::site::list_snapshots))
        .route("/sites/{id}/mutations", get(handlers::site::list_mutations));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health (no identity required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
