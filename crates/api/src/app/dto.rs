use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use stockbridge_core::{LocationId, ProductId};
use stockbridge_inventory::{AdjustRequest, MoveRequest, OperationError, StockQuery};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct MoveStockRequest {
    pub product_id: i64,
    pub from_location_id: i64,
    pub to_location_id: i64,
    pub quantity: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl MoveStockRequest {
    pub fn into_domain(self) -> Result<MoveRequest, OperationError> {
        Ok(MoveRequest {
            product_id: ProductId::try_new(self.product_id)?,
            from_location_id: LocationId::try_new(self.from_location_id)?,
            to_location_id: LocationId::try_new(self.to_location_id)?,
            quantity: self.quantity,
            note: self.note,
        })
    }
}

/// `quantity` is the signed delta: negative removes stock.
#[derive(Debug, Deserialize)]
pub struct AdjustQuantityRequest {
    pub product_id: i64,
    pub location_id: i64,
    pub quantity: f64,
    /// Accepted for compatibility; quants have nowhere to store it.
    #[serde(default)]
    pub note: Option<String>,
}

impl AdjustQuantityRequest {
    pub fn into_domain(self) -> Result<AdjustRequest, OperationError> {
        Ok(AdjustRequest {
            product_id: ProductId::try_new(self.product_id)?,
            location_id: LocationId::try_new(self.location_id)?,
            delta: self.quantity,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQueryParams {
    pub product_id: Option<i64>,
    pub location_id: Option<i64>,
    pub limit: Option<u32>,
}

impl StockQueryParams {
    pub fn into_domain(self) -> Result<StockQuery, OperationError> {
        Ok(StockQuery {
            product_id: self.product_id.map(ProductId::try_new).transpose()?,
            location_id: self.location_id.map(LocationId::try_new).transpose()?,
            limit: self.limit,
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct MoveStockData {
    pub picking_id: i64,
    pub move_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AdjustQuantityData {
    pub quant_id: i64,
}

/// `{success: true, message, data}`.
pub fn success(message: impl Into<String>, data: impl Serialize) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message.into(),
        "data": data,
    }))
}

/// `{success: true, count, data: [...]}`.
pub fn listing<T: Serialize>(items: &[T]) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": items.len(),
        "data": items,
    }))
}
