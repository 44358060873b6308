use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Page, StockGateway};
use crate::error::GatewayError;
use crate::filter::Filter;
use crate::session::{Session, SessionManager};
use crate::transport::{Endpoint, RpcTransport};
use stockbridge_core::Record;

/// `StockGateway` over the backend's `execute_kw` call.
///
/// Holds the transport and an explicit session manager; neither is global.
pub struct OdooGateway {
    transport: Arc<dyn RpcTransport>,
    sessions: Arc<SessionManager>,
}

impl OdooGateway {
    pub fn new(transport: Arc<dyn RpcTransport>, sessions: Arc<SessionManager>) -> Self {
        Self { transport, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// `execute(collection, method, positional_args, keyword_args)`.
    ///
    /// A call rejected as unauthenticated invalidates the session and is
    /// replayed once with a fresh login.
    pub async fn execute(
        &self,
        collection: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, GatewayError> {
        let session = self.sessions.acquire(self.transport.as_ref()).await?;
        match self.execute_kw(&session, collection, method, &args, &kwargs).await {
            Err(e) if e.is_auth_rejected() => {
                tracing::warn!(collection, method, error = %e, "session rejected; re-authenticating");
                self.sessions.invalidate(&session).await;
                let fresh = self.sessions.acquire(self.transport.as_ref()).await?;
                self.execute_kw(&fresh, collection, method, &args, &kwargs)
                    .await
                    .map_err(|e| match e {
                        e if e.is_auth_rejected() => GatewayError::Authentication(e.to_string()),
                        e => e,
                    })
            }
            other => other,
        }
    }

    async fn execute_kw(
        &self,
        session: &Session,
        collection: &str,
        method: &str,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Value, GatewayError> {
        let creds = self.sessions.credentials();
        tracing::debug!(collection, method, "execute_kw");
        self.transport
            .call(
                Endpoint::Object,
                "execute_kw",
                vec![
                    Value::from(creds.database()),
                    Value::from(session.uid),
                    Value::from(creds.password()),
                    Value::from(collection),
                    Value::from(method),
                    Value::Array(args.to_vec()),
                    Value::Object(kwargs.clone()),
                ],
            )
            .await
    }
}

fn page_kwargs(page: &Page) -> Map<String, Value> {
    let mut kwargs = Map::new();
    kwargs.insert("offset".to_string(), json!(page.offset));
    kwargs.insert("order".to_string(), json!(page.order));
    if let Some(limit) = page.limit {
        kwargs.insert("limit".to_string(), json!(limit));
    }
    kwargs
}

fn fields_value(fields: &[&str]) -> Value {
    Value::Array(fields.iter().map(|f| Value::from(*f)).collect())
}

fn ids_value(ids: &[i64]) -> Value {
    Value::Array(ids.iter().map(|id| Value::from(*id)).collect())
}

fn expect_ids(v: Value) -> Result<Vec<i64>, GatewayError> {
    match v {
        Value::Array(items) => items
            .into_iter()
            .map(|i| i.as_i64().ok_or_else(|| GatewayError::unexpected("search returned a non-integer id")))
            .collect(),
        other => Err(GatewayError::unexpected(format!("expected id list, got {other}"))),
    }
}

fn expect_records(v: Value) -> Result<Vec<Record>, GatewayError> {
    match v {
        Value::Array(items) => items
            .into_iter()
            .map(|i| match i {
                Value::Object(map) => Ok(map),
                other => Err(GatewayError::unexpected(format!("expected record, got {other}"))),
            })
            .collect(),
        other => Err(GatewayError::unexpected(format!("expected record list, got {other}"))),
    }
}

fn expect_bool(v: Value) -> Result<bool, GatewayError> {
    v.as_bool()
        .ok_or_else(|| GatewayError::unexpected(format!("expected boolean, got {v}")))
}

#[async_trait]
impl StockGateway for OdooGateway {
    async fn find(&self, collection: &str, filter: &Filter, page: &Page) -> Result<Vec<i64>, GatewayError> {
        let v = self
            .execute(collection, "search", vec![filter.to_json()], page_kwargs(page))
            .await?;
        expect_ids(v)
    }

    async fn fetch(&self, collection: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Record>, GatewayError> {
        let mut kwargs = Map::new();
        if !fields.is_empty() {
            kwargs.insert("fields".to_string(), fields_value(fields));
        }
        let v = self.execute(collection, "read", vec![ids_value(ids)], kwargs).await?;
        expect_records(v)
    }

    async fn find_and_fetch(
        &self,
        collection: &str,
        filter: &Filter,
        fields: &[&str],
        page: &Page,
    ) -> Result<Vec<Record>, GatewayError> {
        let mut kwargs = page_kwargs(page);
        if !fields.is_empty() {
            kwargs.insert("fields".to_string(), fields_value(fields));
        }
        let v = self
            .execute(collection, "search_read", vec![filter.to_json()], kwargs)
            .await?;
        expect_records(v)
    }

    async fn create(&self, collection: &str, values: Record) -> Result<i64, GatewayError> {
        let v = self
            .execute(collection, "create", vec![Value::Object(values)], Map::new())
            .await?;
        // Newer backends answer a create with a one-element id list.
        match &v {
            Value::Array(items) if items.len() == 1 => items[0].as_i64(),
            other => other.as_i64(),
        }
        .ok_or_else(|| GatewayError::unexpected(format!("create returned {v}")))
    }

    async fn update(&self, collection: &str, ids: &[i64], values: Record) -> Result<bool, GatewayError> {
        let v = self
            .execute(collection, "write", vec![ids_value(ids), Value::Object(values)], Map::new())
            .await?;
        expect_bool(v)
    }

    async fn remove(&self, collection: &str, ids: &[i64]) -> Result<bool, GatewayError> {
        let v = self
            .execute(collection, "unlink", vec![ids_value(ids)], Map::new())
            .await?;
        expect_bool(v)
    }

    async fn invoke(
        &self,
        collection: &str,
        action: &str,
        ids: &[i64],
        extra_args: Vec<Value>,
    ) -> Result<Value, GatewayError> {
        let mut args = Vec::with_capacity(1 + extra_args.len());
        args.push(ids_value(ids));
        args.extend(extra_args);
        self.execute(collection, action, args, Map::new()).await
    }

    async fn server_version(&self) -> Result<Value, GatewayError> {
        self.transport.call(Endpoint::Common, "version", vec![]).await
    }

    async fn authenticated_uid(&self) -> Result<i64, GatewayError> {
        Ok(self.sessions.acquire(self.transport.as_ref()).await?.uid)
    }
}
