//! The `StockGateway` contract and its implementations.

mod in_memory;
mod odoo;

pub use in_memory::{InMemoryStockBackend, RecordedCall};
pub use odoo::OdooGateway;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayError;
use crate::filter::Filter;
use stockbridge_core::Record;

/// Ordering and paging of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Backend order clause, e.g. `"id"` or `"date desc"`.
    pub order: String,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            order: "id".to_string(),
            limit: None,
            offset: 0,
        }
    }
}

impl Page {
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

/// Generic record access on named remote collections.
///
/// Every call commits on its own; there is no multi-call transaction. Filters
/// are forwarded untouched.
#[async_trait]
pub trait StockGateway: Send + Sync {
    /// `search`: ids of matching records.
    async fn find(&self, collection: &str, filter: &Filter, page: &Page) -> Result<Vec<i64>, GatewayError>;

    /// `read`: the listed fields of the given records (all fields when empty).
    async fn fetch(&self, collection: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Record>, GatewayError>;

    /// `search_read`: search and read in one round trip.
    async fn find_and_fetch(
        &self,
        collection: &str,
        filter: &Filter,
        fields: &[&str],
        page: &Page,
    ) -> Result<Vec<Record>, GatewayError>;

    async fn create(&self, collection: &str, values: Record) -> Result<i64, GatewayError>;

    async fn update(&self, collection: &str, ids: &[i64], values: Record) -> Result<bool, GatewayError>;

    async fn remove(&self, collection: &str, ids: &[i64]) -> Result<bool, GatewayError>;

    /// Named side-effecting action with no CRUD equivalent
    /// (`action_confirm`, `action_assign`, `button_validate`, ...).
    async fn invoke(
        &self,
        collection: &str,
        action: &str,
        ids: &[i64],
        extra_args: Vec<Value>,
    ) -> Result<Value, GatewayError>;

    /// Backend version information.
    async fn server_version(&self) -> Result<Value, GatewayError>;

    /// User id of the authenticated session (logging in if needed).
    async fn authenticated_uid(&self) -> Result<i64, GatewayError>;
}

#[async_trait]
impl<G> StockGateway for Arc<G>
where
    G: StockGateway + ?Sized,
{
    async fn find(&self, collection: &str, filter: &Filter, page: &Page) -> Result<Vec<i64>, GatewayError> {
        (**self).find(collection, filter, page).await
    }

    async fn fetch(&self, collection: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Record>, GatewayError> {
        (**self).fetch(collection, ids, fields).await
    }

    async fn find_and_fetch(
        &self,
        collection: &str,
        filter: &Filter,
        fields: &[&str],
        page: &Page,
    ) -> Result<Vec<Record>, GatewayError> {
        (**self).find_and_fetch(collection, filter, fields, page).await
    }

    async fn create(&self, collection: &str, values: Record) -> Result<i64, GatewayError> {
        (**self).create(collection, values).await
    }

    async fn update(&self, collection: &str, ids: &[i64], values: Record) -> Result<bool, GatewayError> {
        (**self).update(collection, ids, values).await
    }

    async fn remove(&self, collection: &str, ids: &[i64]) -> Result<bool, GatewayError> {
        (**self).remove(collection, ids).await
    }

    async fn invoke(
        &self,
        collection: &str,
        action: &str,
        ids: &[i64],
        extra_args: Vec<Value>,
    ) -> Result<Value, GatewayError> {
        (**self).invoke(collection, action, ids, extra_args).await
    }

    async fn server_version(&self) -> Result<Value, GatewayError> {
        (**self).server_version().await
    }

    async fn authenticated_uid(&self) -> Result<i64, GatewayError> {
        (**self).authenticated_uid().await
    }
}

/// Build a `Record` from a `json!({...})` literal.
pub fn values(v: Value) -> Record {
    match v {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
