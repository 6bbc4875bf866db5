// Domain error types - per-request and per-item failures

use thiserror::Error;

/// Main error type for the access service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Malformed or missing request data (HTTP 400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Identity unknown or nothing eligible (HTTP 404)
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Lock controller could not be reached (HTTP 503)
    #[error("Lock controller unreachable: {0}")]
    HardwareUnreachable(String),

    /// Lock controller answered but refused the command (HTTP 502)
    #[error("Lock controller rejected command: {0}")]
    HardwareRejected(String),

    /// Item store or ledger failure (HTTP 500)
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// Item id unknown to the item store (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl AccessError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::InvalidInput(_) => 400,
            AccessError::AccessDenied(_) => 404,
            AccessError::HardwareUnreachable(_) => 503,
            AccessError::HardwareRejected(_) => 502,
            AccessError::PersistenceError(_) => 500,
            AccessError::NotFound(_) => 404,
            AccessError::ConfigurationError(_) => 500,
        }
    }

    /// Get user-friendly error message (no storage or config internals)
    pub fn user_message(&self) -> String {
        match self {
            AccessError::InvalidInput(reason) => reason.clone(),
            AccessError::AccessDenied(reason) => reason.clone(),
            AccessError::HardwareUnreachable(_) => "Lock controller unreachable".to_string(),
            AccessError::HardwareRejected(reason) => format!("Lock controller rejected command: {}", reason),
            AccessError::PersistenceError(_) => "Internal error".to_string(),
            AccessError::NotFound(what) => format!("Not found: {}", what),
            AccessError::ConfigurationError(_) => "Internal error".to_string(),
        }
    }
}

impl From<sqlx::Error> for AccessError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AccessError::NotFound("row".to_string()),
            other => AccessError::PersistenceError(other.to_string()),
        }
    }
}
