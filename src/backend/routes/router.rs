/**
 * Router Configuration
 *
 * Combines the route configurations into a single Axum router.
 *
 * # Route Order
 *
 * 1. Health check (public)
 * 2. API routes (progress, behind the auth middleware)
 * 3. Fallback handler (JSON 404)
 *
 * Every request is traced through `tower_http::trace::TraceLayer`.
 */

use axum::{http::StatusCode, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::backend::error::BackendError;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new().route("/health", get(|| async { "OK" }));

    let router = configure_api_routes(router);

    let router = router.fallback(|| async {
        BackendError::handler(StatusCode::NOT_FOUND, "Route not found")
    });

    router
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
