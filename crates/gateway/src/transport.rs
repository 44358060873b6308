//! JSON-RPC transport to the backend.
//!
//! Every backend call is a JSON-RPC 2.0 `call` request whose params name a
//! service (`common` for login, `object` for record access), a method and
//! positional arguments:
//!
//! ```text
//! {"jsonrpc":"2.0","method":"call","id":7,
//!  "params":{"service":"object","method":"execute_kw","args":[db, uid, pw, model, method, args, kwargs]}}
//! ```
//!
//! Retries live here and nowhere else: one retry on connect errors, timeouts
//! and gateway-class HTTP statuses. A fault answer is never retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Authentication / server information.
    Common,
    /// Record access (`execute_kw`).
    Object,
}

impl Endpoint {
    pub fn service(self) -> &'static str {
        match self {
            Endpoint::Common => "common",
            Endpoint::Object => "object",
        }
    }
}

/// Carries one RPC call to the backend and returns its `result`.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(
        &self,
        endpoint: Endpoint,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, GatewayError>;
}

#[async_trait]
impl<T> RpcTransport for Arc<T>
where
    T: RpcTransport + ?Sized,
{
    async fn call(
        &self,
        endpoint: Endpoint,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, GatewayError> {
        (**self).call(endpoint, method, args).await
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: CallParams<'a>,
    id: u64,
}

#[derive(Debug, Serialize)]
struct CallParams<'a> {
    service: &'static str,
    method: &'a str,
    args: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<FaultData>,
}

#[derive(Debug, Deserialize)]
struct FaultData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<JsonRpcError> for GatewayError {
    fn from(err: JsonRpcError) -> Self {
        let (name, detail) = match err.data {
            Some(d) => (d.name, d.message),
            None => (None, None),
        };
        GatewayError::fault(err.code, name, detail.unwrap_or(err.message))
    }
}

enum AttemptError {
    Transient(String),
    Fatal(GatewayError),
}

/// JSON-RPC over HTTP POST (reqwest).
#[derive(Debug)]
pub struct HttpJsonRpc {
    http: reqwest::Client,
    common_url: String,
    object_url: String,
    retry_transient: bool,
    request_id: AtomicU64,
}

impl HttpJsonRpc {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            common_url: format!("{}{}", config.url, config.common_path),
            object_url: format!("{}{}", config.url, config.object_path),
            retry_transient: config.retry_transient,
            request_id: AtomicU64::new(1),
        })
    }

    fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Common => &self.common_url,
            Endpoint::Object => &self.object_url,
        }
    }

    async fn attempt(&self, url: &str, request: &JsonRpcRequest<'_>) -> Result<Value, AttemptError> {
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let transient = e.is_connect() || e.is_timeout();
                // Never format the request body: it carries the password.
                let msg = e.without_url().to_string();
                if transient {
                    AttemptError::Transient(msg)
                } else {
                    AttemptError::Fatal(GatewayError::Transport(msg))
                }
            })?;

        let status = response.status();
        if matches!(status.as_u16(), 502..=504) {
            return Err(AttemptError::Transient(format!("backend returned HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(GatewayError::Transport(format!(
                "backend returned HTTP {status}"
            ))));
        }

        let body: JsonRpcResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Transient(e.without_url().to_string())
            } else {
                AttemptError::Fatal(GatewayError::unexpected(format!(
                    "invalid JSON-RPC response: {}",
                    e.without_url()
                )))
            }
        })?;

        if let Some(error) = body.error {
            return Err(AttemptError::Fatal(error.into()));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl RpcTransport for HttpJsonRpc {
    async fn call(
        &self,
        endpoint: Endpoint,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, GatewayError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "call",
            params: CallParams {
                service: endpoint.service(),
                method,
                args: &args,
            },
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };
        let url = self.url(endpoint);

        match self.attempt(url, &request).await {
            Ok(v) => Ok(v),
            Err(AttemptError::Fatal(e)) => Err(e),
            Err(AttemptError::Transient(msg)) if self.retry_transient => {
                tracing::warn!(service = endpoint.service(), method, error = %msg, "transient RPC failure; retrying once");
                match self.attempt(url, &request).await {
                    Ok(v) => Ok(v),
                    Err(AttemptError::Fatal(e)) => Err(e),
                    Err(AttemptError::Transient(msg)) => Err(GatewayError::Transport(msg)),
                }
            }
            Err(AttemptError::Transient(msg)) => Err(GatewayError::Transport(msg)),
        }
    }
}
