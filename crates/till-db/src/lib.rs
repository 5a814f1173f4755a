//! # till-db: Database Layer for the Till Ledger
//!
//! Durable storage for sale documents, cash sessions and the invoice
//! sequence, using SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Ledger Data Flow                            │
//! │                                                                         │
//! │  LedgerEngine::confirm                                                 │
//! │       │  LedgerCommit { documents, sessions, sequence }                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │ commit()      │◄───│ DocumentRepo   │   │ 001_initial  │  │   │
//! │  │   │ load_snapshot │    │ SessionRepo    │   │ _schema.sql  │  │   │
//! │  │   │               │    │ SequenceRepo   │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (ledger.db in the platform data directory)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ledger.db")).await?;
//! let snapshot = db.load_snapshot().await?;
//! db.commit(&commit).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, LedgerSnapshot};

pub use repository::document::DocumentRepository;
pub use repository::sequence::SequenceRepository;
pub use repository::session::SessionRepository;
