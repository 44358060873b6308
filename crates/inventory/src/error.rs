use stockbridge_core::DomainError;
use stockbridge_gateway::GatewayError;
use thiserror::Error;

/// Outcome classes of an inventory operation.
///
/// Closed set: the HTTP boundary maps each to one status code.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperationError {
    /// The backend refused the service credentials.
    #[error("{0}")]
    Authentication(String),

    /// A structural precondition is missing on the backend side.
    #[error("{0}")]
    NotFound(String),

    /// Caller input was rejected before any mutation.
    #[error("{0}")]
    Validation(String),

    /// The backend failed or faulted.
    #[error("{0}")]
    Remote(String),
}

impl OperationError {
    /// Machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            OperationError::Authentication(_) => "authentication_error",
            OperationError::NotFound(_) => "not_found",
            OperationError::Validation(_) => "validation_error",
            OperationError::Remote(_) => "remote_error",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<GatewayError> for OperationError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::Authentication(msg) => OperationError::Authentication(msg),
            GatewayError::Fault { message, .. } => OperationError::Remote(message),
            other => OperationError::Remote(other.to_string()),
        }
    }
}

impl From<DomainError> for OperationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => OperationError::Validation(msg),
            DomainError::Malformed(_) => OperationError::Remote(value.to_string()),
        }
    }
}
