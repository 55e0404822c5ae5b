use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/v1/businesses/:slug/services",
            get(handlers::slots::list_services),
        )
        .route(
            "/v1/businesses/:slug/services/:service_id/slots",
            get(handlers::slots::day_slots),
        )
        .route(
            "/v1/businesses/:slug/services/:service_id/nearest",
            get(handlers::slots::nearest_date),
        )
        .route(
            "/v1/businesses/:slug/services/:service_id/questions",
            get(handlers::slots::service_questions),
        )
        .route(
            "/v1/timezone-note",
            get(handlers::timezone::timezone_note),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
