//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend wiring (gateway, orchestrators, session)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses and status mapping

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// `prefix` is either empty or a normalized `/segment[/segment]` path.
pub fn build_app(services: Arc<AppServices>, prefix: &str) -> Router {
    let api = routes::router().layer(Extension(services));

    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}
