//! API module
//!
//! HTTP intake endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::http::HeaderName;
use axum::{middleware as axum_middleware, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use routes::{create_router, AppState};

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(middleware::REQUEST_ID_HEADER);

    // Layers run outermost-last: request id is set before logging sees it
    create_router()
        .route("/health", axum::routing::get(health_check))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}
