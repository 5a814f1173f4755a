//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── LedgerError      - Illegal transitions, unknown ids, drawer rules │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till-ledger errors                                                    │
//! │  └── EngineError      - What callers see, with an ErrorCode            │
//! │                                                                         │
//! │  Flow: ValidationError → LedgerError → EngineError → UI / API          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is recoverable. The engine never retries on its own and
//! never "fixes" a rejected request; the caller decides what happens next.

use thiserror::Error;

use crate::types::DocumentStatus;

// =============================================================================
// Ledger Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The operation is not legal from the document's current state.
    ///
    /// ## When This Occurs
    /// - Deleting a quotation, confirmed or refunded document
    /// - Editing a refunded document
    /// - Saving a draft over an existing quotation (or the reverse)
    #[error("Cannot {operation} document {document_id} while it is {status}")]
    InvalidTransition {
        document_id: String,
        status: DocumentStatus,
        operation: &'static str,
    },

    /// Document identifier unknown.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A second refund of the same invoice.
    ///
    /// ## User Workflow
    /// ```text
    /// Refund INV-0001 ──► Refunded
    ///      │
    ///      ▼
    /// Refund INV-0001 again
    ///      │
    ///      ▼
    /// AlreadyRefunded { invoice_number: "INV-0001" }
    /// ```
    #[error("Document {document_id} ({invoice_number}) has already been refunded")]
    AlreadyRefunded {
        document_id: String,
        invoice_number: String,
    },

    /// A drawer is already open where the policy allows only one.
    #[error("Cash session {session_id} is already open for {cashier_id}")]
    SessionAlreadyOpen {
        session_id: String,
        cashier_id: String,
    },

    /// Session identifier unknown.
    #[error("Cash session not found: {0}")]
    SessionNotFound(String),

    /// Operation on a session that has been closed.
    #[error("Cash session {0} is already closed")]
    SessionAlreadyClosed(String),

    /// A cash-settled operation found no open drawer to move.
    #[error("No open cash session{}", cashier_id.as_ref().map(|c| format!(" for cashier {c}")).unwrap_or_default())]
    NoOpenSession { cashier_id: Option<String> },

    /// The invoice counter would no longer fit its configured width.
    #[error("Invoice sequence {prefix} exhausted: {next} does not fit in {width} digits")]
    SequenceExhausted {
        prefix: String,
        next: u64,
        width: u32,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl LedgerError {
    /// Creates an InvalidTransition error.
    pub fn invalid_transition(
        document_id: impl Into<String>,
        status: DocumentStatus,
        operation: &'static str,
    ) -> Self {
        LedgerError::InvalidTransition {
            document_id: document_id.into(),
            status,
            operation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a request doesn't meet requirements.
/// They are raised before any invoice number is allocated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection that must hold at least one entry is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid prefix, invalid id).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
