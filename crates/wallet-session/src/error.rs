//! Error types for wallet-session

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::ProviderFailure;
use crate::session::{Operation, SessionStatus};

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {operation} while the session is {status}")]
    InvalidState {
        operation: Operation,
        status: SessionStatus,
    },

    #[error("Cannot {operation} while another session operation is in flight")]
    OperationInFlight { operation: Operation },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Provider error: {0}")]
    Provider(#[source] ProviderFailure),

    #[error("Transaction failed: {0}")]
    Transaction(#[source] ProviderFailure),

    #[error("Signing failed: {0}")]
    Signing(#[source] ProviderFailure),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Coarse classification of session failures for display layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidState,
    ValidationError,
    InsufficientBalance,
    ProviderError,
    TransactionError,
    SigningError,
    ConfigError,
}

impl SessionError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::InvalidState { .. } | SessionError::OperationInFlight { .. } => {
                ErrorKind::InvalidState
            }
            SessionError::Validation(_) => ErrorKind::ValidationError,
            SessionError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            SessionError::Provider(_) => ErrorKind::ProviderError,
            SessionError::Transaction(_) => ErrorKind::TransactionError,
            SessionError::Signing(_) => ErrorKind::SigningError,
            SessionError::Config(_)
            | SessionError::IoError(_)
            | SessionError::SerializationError(_) => ErrorKind::ConfigError,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        SessionError::Validation(message.into())
    }
}
