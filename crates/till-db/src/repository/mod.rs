//! # Repository Module
//!
//! Repository implementations for the ledger's three record sets.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Ledger Engine                                                         │
//! │       │                                                                 │
//! │       ├── db.commit(&LedgerCommit)   ← one transaction, all sets       │
//! │       │                                                                 │
//! │       └── db.load_snapshot()         ← startup, all sets               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DocumentRepository   SessionRepository   SequenceRepository           │
//! │       │                     │                    │                      │
//! │       ▼                     ▼                    ▼                      │
//! │  sale_documents        cash_sessions       invoice_sequence            │
//! │  sale_document_items                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each module exposes a pool-backed loader plus `pub(crate)` writers that
//! run on a caller-supplied connection, so `Database::commit` can group
//! writes from all three in one transaction.

pub mod document;
pub mod sequence;
pub mod session;
