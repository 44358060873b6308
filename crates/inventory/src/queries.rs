//! Read-only stock views.

use stockbridge_core::{Entity, LocationId, ProductId, Quant, StockMove};
use stockbridge_gateway::{Condition, Filter, Page, StockGateway};

use crate::error::OperationError;

pub const DEFAULT_STOCK_LIMIT: u32 = 100;
pub const MAX_STOCK_LIMIT: u32 = 500;
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockQuery {
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
    pub limit: Option<u32>,
}

pub struct StockQueries<G> {
    gateway: G,
}

impl<G: StockGateway> StockQueries<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Non-zero quants ordered by product, then location.
    pub async fn stock_levels(&self, query: &StockQuery) -> Result<Vec<Quant>, OperationError> {
        let mut filter = Filter::new().ne("quantity", 0);
        if let Some(product) = query.product_id {
            filter = filter.eq("product_id", product);
        }
        if let Some(location) = query.location_id {
            filter = filter.eq("location_id", location);
        }
        let page = Page::default()
            .order("product_id, location_id")
            .limit(clamp_limit(query.limit, DEFAULT_STOCK_LIMIT, MAX_STOCK_LIMIT)?);

        let rows = self
            .gateway
            .find_and_fetch(Quant::COLLECTION, &filter, Quant::FIELDS, &page)
            .await?;
        rows.iter()
            .map(|r| Quant::from_record(r).map_err(OperationError::from))
            .collect()
    }

    /// Completed moves, newest first. A location matches as source or
    /// destination.
    pub async fn move_history(&self, query: &StockQuery) -> Result<Vec<StockMove>, OperationError> {
        let mut filter = Filter::new().eq("state", "done");
        if let Some(product) = query.product_id {
            filter = filter.eq("product_id", product);
        }
        if let Some(location) = query.location_id {
            filter = filter.any_of(
                Condition::eq("location_id", location),
                Condition::eq("location_dest_id", location),
            );
        }
        let page = Page::default()
            .order("date desc")
            .limit(clamp_limit(query.limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT)?);

        let rows = self
            .gateway
            .find_and_fetch(StockMove::COLLECTION, &filter, StockMove::FIELDS, &page)
            .await?;
        rows.iter()
            .map(|r| StockMove::from_record(r).map_err(OperationError::from))
            .collect()
    }
}

fn clamp_limit(requested: Option<u32>, default: u32, max: u32) -> Result<u32, OperationError> {
    match requested {
        None => Ok(default),
        Some(0) => Err(OperationError::validation("limit must be at least 1")),
        Some(n) if n > max => Err(OperationError::validation(format!("limit must be at most {max}"))),
        Some(n) => Ok(n),
    }
}
