//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use routes::{create_router, AppState};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Note: Axum layers are applied in reverse order (last added = first executed)
    // Order: identity -> logging -> handler
    let protected_routes = create_router()
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    let api = protected_routes.merge(routes::catalog_router());

    Router::new()
        // Health check (no identity)
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
