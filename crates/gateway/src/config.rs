//! Gateway configuration, read from the environment once at startup.

use std::time::Duration;

use crate::session::Credentials;

/// Connection settings for the remote stock backend.
#[derive(Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Path of the authentication (`common`) endpoint.
    pub common_path: String,
    /// Path of the record (`object`) endpoint.
    pub object_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Retry once on connect errors and timeouts.
    pub retry_transient: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8069".to_string(),
            database: "odoo".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            common_path: "/jsonrpc".to_string(),
            object_path: "/jsonrpc".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            retry_transient: true,
        }
    }
}

impl GatewayConfig {
    /// Build from `ODOO_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        if lookup("ODOO_PASSWORD").is_none() {
            tracing::warn!("ODOO_PASSWORD not set; backend login will likely fail");
        }

        Self {
            url: lookup("ODOO_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.url),
            database: lookup("ODOO_DB").unwrap_or(defaults.database),
            username: lookup("ODOO_USERNAME").unwrap_or(defaults.username),
            password: lookup("ODOO_PASSWORD").unwrap_or(defaults.password),
            common_path: lookup("ODOO_COMMON_PATH").unwrap_or(defaults.common_path),
            object_path: lookup("ODOO_OBJECT_PATH").unwrap_or(defaults.object_path),
            connect_timeout: secs("ODOO_CONNECT_TIMEOUT_SECS", defaults.connect_timeout),
            request_timeout: secs("ODOO_REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            retry_transient: lookup("ODOO_RETRY_TRANSIENT")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
                .unwrap_or(defaults.retry_transient),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.database, &self.username, &self.password)
    }
}

impl core::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("common_path", &self.common_path)
            .field("object_path", &self.object_path)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("retry_transient", &self.retry_transient)
            .finish()
    }
}
