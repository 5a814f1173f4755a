//! # Engine Error Type
//!
//! Unified error type for ledger engine operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Ledger Engine                      │
//! │                                                                         │
//! │  Terminal / API layer            LedgerEngine                           │
//! │  ────────────────────            ────────────                           │
//! │                                                                         │
//! │  engine.refund(id, "manager")                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Rule check?   ─── LedgerError::AlreadyRefunded ──┐             │  │
//! │  │         │                                         │             │  │
//! │  │         ▼                                         ▼             │  │
//! │  │  Durable write? ── DbError::TransactionFailed ── EngineError ──►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  match err.code() {                                                     │
//! │      ErrorCode::AlreadyRefunded => show "already refunded",             │
//! │      ErrorCode::StorageError    => offer retry,                         │
//! │      ...                                                                │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is recoverable: a failed operation leaves the ledger as it
//! was and the caller decides whether to retry, edit or abandon.

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use till_core::LedgerError;
use till_db::DbError;

/// Errors returned by [`crate::LedgerEngine`] and configuration loading.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A ledger rule refused the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The durable store failed; nothing was applied.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    /// Configuration file could not be written.
    #[error("Failed to save configuration: {0}")]
    ConfigSaveFailed(String),
}

/// Machine-readable error codes for callers.
///
/// ## Serialized Form
/// ```json
/// { "code": "SESSION_ALREADY_OPEN", "message": "Cash session ... is already open for c1" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidTransition,
    NotFound,
    AlreadyRefunded,
    SessionAlreadyOpen,
    SessionNotFound,
    SessionAlreadyClosed,
    NoOpenSession,
    SequenceExhausted,
    ValidationError,
    StorageError,
    ConfigError,
}

impl EngineError {
    /// The code a caller branches on.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Ledger(e) => match e {
                LedgerError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
                LedgerError::NotFound(_) => ErrorCode::NotFound,
                LedgerError::AlreadyRefunded { .. } => ErrorCode::AlreadyRefunded,
                LedgerError::SessionAlreadyOpen { .. } => ErrorCode::SessionAlreadyOpen,
                LedgerError::SessionNotFound(_) => ErrorCode::SessionNotFound,
                LedgerError::SessionAlreadyClosed(_) => ErrorCode::SessionAlreadyClosed,
                LedgerError::NoOpenSession { .. } => ErrorCode::NoOpenSession,
                LedgerError::SequenceExhausted { .. } => ErrorCode::SequenceExhausted,
                LedgerError::Validation(_) => ErrorCode::ValidationError,
            },
            EngineError::Storage(_) => ErrorCode::StorageError,
            EngineError::InvalidConfig(_)
            | EngineError::ConfigLoadFailed(_)
            | EngineError::ConfigSaveFailed(_) => ErrorCode::ConfigError,
        }
    }

    /// The ledger rule that refused the operation, if any.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            EngineError::Ledger(e) => Some(e),
            _ => None,
        }
    }

    /// Serializable `{ code, message }` view for an API boundary.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// What a presentation layer receives when an operation fails.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl From<till_core::ValidationError> for EngineError {
    fn from(err: till_core::ValidationError) -> Self {
        EngineError::Ledger(LedgerError::Validation(err))
    }
}

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{DocumentStatus, ValidationError};

    #[test]
    fn test_codes() {
        let err = EngineError::from(LedgerError::invalid_transition(
            "d1",
            DocumentStatus::Confirmed,
            "delete",
        ));
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
        assert_eq!(
            err.to_string(),
            "Cannot delete document d1 while it is confirmed"
        );

        let err = EngineError::from(ValidationError::required("customer"));
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = EngineError::from(DbError::TransactionFailed("disk full".into()));
        assert_eq!(err.code(), ErrorCode::StorageError);
        assert!(err.as_ledger().is_none());
    }

    #[test]
    fn test_response_serialization() {
        let err = EngineError::from(LedgerError::NoOpenSession {
            cashier_id: Some("c1".into()),
        });
        let json = serde_json::to_value(err.to_response()).unwrap();

        assert_eq!(json["code"], "NO_OPEN_SESSION");
        assert_eq!(json["message"], "No open cash session for cashier c1");
    }
}
