use axum::{routing::get, Router};

pub mod inventory;
pub mod system;

/// Router for every endpoint below the configured prefix.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/test-connection", get(system::test_connection))
        .nest("/inventory", inventory::router())
}
