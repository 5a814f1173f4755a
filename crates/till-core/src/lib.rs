//! # till-core: Pure Ledger Logic
//!
//! This crate is the **heart** of the transaction ledger. It owns every rule
//! that decides what a sale document may become, which invoice number it
//! receives and how the cash drawer moves, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Terminals / Sales journal / Reporting (external)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ candidate documents                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-ledger (LedgerEngine)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ document  │  │ sequence  │  │  session  │  │   store   │  │   │
//! │  │   │ Draft     │  │ INV-0001  │  │ drawer    │  │ documents │  │   │
//! │  │   │ Confirmed │  │ INV-0002  │  │ variance  │  │ by id     │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Identifiers, catalog snapshot, sale items, status enums
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`document`] - The tagged `SaleDocument` and its transitions
//! - [`sequence`] - Invoice number allocation
//! - [`session`] - Cash drawer sessions and reconciliation
//! - [`store`] - In-memory sale document store and listing filters
//! - [`commit`] - Change sets handed to the durable store
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::sequence::InvoiceSequence;
//!
//! let mut sequence = InvoiceSequence::new("INV-", 1, 4);
//! assert_eq!(sequence.peek().unwrap().as_str(), "INV-0001");
//! assert_eq!(sequence.allocate().unwrap().as_str(), "INV-0001");
//! assert_eq!(sequence.allocate().unwrap().as_str(), "INV-0002");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commit;
pub mod document;
pub mod error;
pub mod money;
pub mod sequence;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use commit::LedgerCommit;
pub use document::{
    CandidateDocument, DocumentBody, PostedInvoice, RefundedInvoice, SaleDocument, Ticket,
};
pub use error::{LedgerError, LedgerResult, ValidationError};
pub use money::Money;
pub use sequence::InvoiceSequence;
pub use session::{CashSession, CashSessionLedger, DrawerPolicy, SessionClosure};
pub use store::{DocumentFilter, DocumentStore};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default invoice prefix when configuration does not provide one.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV-";

/// Default zero-padded width of the numeric part of an invoice number.
pub const DEFAULT_INVOICE_WIDTH: u32 = 4;

/// Widest numeric part the allocator accepts (fits in a `u64`).
pub const MAX_INVOICE_WIDTH: u32 = 18;

/// Customer name stored on drafts and invoices submitted without one.
pub const WALK_IN_CUSTOMER: &str = "Walk-in";

/// Maximum lines allowed on a single document.
///
/// ## Business Reason
/// A restaurant ticket or event quotation never legitimately needs more;
/// the cap stops runaway documents from a stuck terminal.
pub const MAX_DOCUMENT_ITEMS: usize = 200;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price accepted on a line, in the smallest currency unit.
///
/// ## Business Reason
/// Keeps every document total, and every drawer tally built from them,
/// well inside i64 (200 lines × 999 × this price).
pub const MAX_UNIT_PRICE: i64 = 100_000_000_000;
