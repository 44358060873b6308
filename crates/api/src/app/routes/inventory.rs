use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/move", post(move_stock))
        .route("/adjust", post(adjust_quantity))
        .route("/stock", get(stock_levels))
        .route("/history", get(move_history))
}

fn bad_body(rejection: JsonRejection) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

fn bad_query(rejection: QueryRejection) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

pub async fn move_stock(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::MoveStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let request = match body {
        Ok(Json(b)) => b,
        Err(rejection) => return bad_body(rejection),
    };
    let request = match request.into_domain() {
        Ok(r) => r,
        Err(e) => return errors::operation_error_to_response(e),
    };

    match services.transfers.move_stock(request).await {
        Ok(outcome) => dto::success(
            outcome.message,
            dto::MoveStockData {
                picking_id: outcome.picking_id.get(),
                move_id: outcome.move_id.get(),
            },
        )
        .into_response(),
        Err(failure) => errors::transfer_failure_to_response(failure),
    }
}

pub async fn adjust_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::AdjustQuantityRequest>, JsonRejection>,
) -> axum::response::Response {
    let request = match body {
        Ok(Json(b)) => b,
        Err(rejection) => return bad_body(rejection),
    };
    let request = match request.into_domain() {
        Ok(r) => r,
        Err(e) => return errors::operation_error_to_response(e),
    };

    match services.adjuster.adjust_quantity(request).await {
        Ok(outcome) => dto::success(
            outcome.message,
            dto::AdjustQuantityData {
                quant_id: outcome.quant_id.get(),
            },
        )
        .into_response(),
        Err(e) => errors::operation_error_to_response(e),
    }
}

pub async fn stock_levels(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::StockQueryParams>, QueryRejection>,
) -> axum::response::Response {
    let params = match params {
        Ok(Query(p)) => p,
        Err(rejection) => return bad_query(rejection),
    };
    let query = match params.into_domain() {
        Ok(q) => q,
        Err(e) => return errors::operation_error_to_response(e),
    };

    match services.queries.stock_levels(&query).await {
        Ok(quants) => dto::listing(&quants).into_response(),
        Err(e) => errors::operation_error_to_response(e),
    }
}

pub async fn move_history(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::StockQueryParams>, QueryRejection>,
) -> axum::response::Response {
    let params = match params {
        Ok(Query(p)) => p,
        Err(rejection) => return bad_query(rejection),
    };
    let query = match params.into_domain() {
        Ok(q) => q,
        Err(e) => return errors::operation_error_to_response(e),
    };

    match services.queries.move_history(&query).await {
        Ok(moves) => dto::listing(&moves).into_response(),
        Err(e) => errors::operation_error_to_response(e),
    }
}
