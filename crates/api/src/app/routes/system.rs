use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use stockbridge_gateway::GatewayError;

use crate::app::errors;
use crate::app::services::{AppServices, SERVICE_NAME};

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}

/// Log in (if needed) and report the backend version.
pub async fn test_connection(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let probe = async {
        let version = services.gateway.server_version().await?;
        let uid = services.gateway.authenticated_uid().await?;
        Ok::<_, GatewayError>((version, uid))
    };

    match probe.await {
        Ok((version, uid)) => Json(json!({
            "success": true,
            "version": version,
            "uid": uid,
            "message": "Successfully connected to the stock backend",
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "connection test failed");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "connection_failed",
                format!("Failed to connect to the stock backend: {e}"),
            )
        }
    }
}
