use thiserror::Error;

/// Gateway operation error.
///
/// Infrastructure failures when talking to the backend, as opposed to the
/// domain errors decided locally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// The login exchange failed or the backend rejected the session.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The request never produced an RPC answer (connect, timeout, HTTP status).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with an RPC fault.
    #[error("remote fault {code}: {message}")]
    Fault {
        code: i64,
        /// Exception class reported by the backend, e.g. `odoo.exceptions.UserError`.
        name: Option<String>,
        message: String,
    },

    /// The backend answered, but not with the shape the call expects.
    #[error("unexpected response: {0}")]
    UnexpectedShape(String),
}

impl GatewayError {
    pub fn fault(code: i64, name: Option<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            code,
            name,
            message: message.into(),
        }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedShape(msg.into())
    }

    /// Fault meaning "the credentials/session were rejected", which warrants a
    /// fresh login rather than surfacing to the caller straight away.
    pub fn is_auth_rejected(&self) -> bool {
        match self {
            GatewayError::Authentication(_) => true,
            GatewayError::Fault { name, message, .. } => {
                let name = name.as_deref().unwrap_or_default();
                name.ends_with("AccessDenied")
                    || name.ends_with("SessionExpiredException")
                    || message == "Access Denied"
            }
            _ => false,
        }
    }
}

impl From<stockbridge_core::DomainError> for GatewayError {
    fn from(value: stockbridge_core::DomainError) -> Self {
        GatewayError::UnexpectedShape(value.to_string())
    }
}
