use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockbridge_inventory::{OperationError, TransferFailure};

/// Status for each operation outcome class.
///
/// A missing transfer type is a precondition of the request, not a missing
/// resource, so `NotFound` is a 400. Everything else is a 500; the body's
/// `error` code still tells an authentication failure apart.
pub fn status_for(err: &OperationError) -> StatusCode {
    match err {
        OperationError::Validation(_) | OperationError::NotFound(_) => StatusCode::BAD_REQUEST,
        OperationError::Authentication(_) | OperationError::Remote(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn operation_error_to_response(err: OperationError) -> axum::response::Response {
    json_error(status_for(&err), err.code(), err.to_string())
}

/// Like `operation_error_to_response`, plus the saga progress when records
/// were already created on the backend.
pub fn transfer_failure_to_response(failure: TransferFailure) -> axum::response::Response {
    let status = status_for(&failure.error);
    let mut body = json!({
        "success": false,
        "error": failure.error.code(),
        "message": failure.error.to_string(),
    });
    if failure.partially_executed() {
        body["data"] = json!({
            "step": failure.step,
            "picking_id": failure.picking_id,
            "move_id": failure.move_id,
            "compensated": failure.compensated(),
        });
    }
    (status, axum::Json(body)).into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
