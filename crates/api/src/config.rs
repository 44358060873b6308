//! Process configuration, read from the environment once at startup.

use std::str::FromStr;

use stockbridge_core::UomId;
use stockbridge_gateway::GatewayConfig;
use stockbridge_inventory::{ReservationPolicy, TransferConfig};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: {message}")]
    Invalid { key: &'static str, message: String },
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}

/// Which `StockGateway` the process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// The remote backend over JSON-RPC.
    #[default]
    Odoo,
    /// Built-in in-memory backend (development only; state is lost on exit).
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "odoo" => Ok(BackendKind::Odoo),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("expected 'odoo' or 'memory', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Path prefix for every route; empty for none.
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    pub gateway: GatewayConfig,
    pub transfer: TransferConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_prefix: String::new(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            backend: BackendKind::default(),
            gateway: GatewayConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let backend = match lookup("STOCK_BACKEND") {
            Some(v) => v
                .parse::<BackendKind>()
                .map_err(|e| invalid("STOCK_BACKEND", e))?,
            None => defaults.backend,
        };

        let port = match lookup("PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|e| invalid("PORT", e.to_string()))?,
            None => defaults.port,
        };

        let reservation_policy = match lookup("RESERVATION_POLICY") {
            Some(v) => v
                .parse::<ReservationPolicy>()
                .map_err(|e| invalid("RESERVATION_POLICY", e))?,
            None => ReservationPolicy::default(),
        };

        let compensate_on_failure = match lookup("COMPENSATE_ON_FAILURE") {
            Some(v) => parse_flag(&v)
                .ok_or_else(|| invalid("COMPENSATE_ON_FAILURE", "expected a boolean"))?,
            None => defaults.transfer.compensate_on_failure,
        };

        let default_uom = match lookup("DEFAULT_UOM_ID") {
            Some(v) => v
                .parse::<UomId>()
                .map_err(|e| invalid("DEFAULT_UOM_ID", e.to_string()))?,
            None => defaults.transfer.default_uom,
        };

        // Only the remote backend needs connection settings (and warns about a
        // missing password).
        let gateway = match backend {
            BackendKind::Odoo => GatewayConfig::from_lookup(&lookup),
            BackendKind::Memory => defaults.gateway,
        };

        Ok(Self {
            api_prefix: normalize_prefix(&lookup("API_PREFIX").unwrap_or_default()),
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            backend,
            gateway,
            transfer: TransferConfig {
                reservation_policy,
                compensate_on_failure,
                default_uom,
                done_field: lookup("MOVE_LINE_DONE_FIELD")
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or(defaults.transfer.done_field),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `"api/v1/"` → `"/api/v1"`; blank or `"/"` → `""`.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
