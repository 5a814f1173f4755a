//! # till-ledger: Ledger Engine
//!
//! Orchestrates sale documents, invoice numbers and cash drawers on top of
//! [`till_core`] rules and [`till_db`] storage.
//!
//! ## Module Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           till-ledger                                   │
//! │                                                                         │
//! │  ┌────────────────────────────────────────────────────────────────┐    │
//! │  │  engine     LedgerEngine: the only writer, lifecycle rules,     │    │
//! │  │             cash routing, snapshot listings                     │    │
//! │  └───────┬───────────────┬──────────────────┬────────────────────┘    │
//! │          │               │                  │                          │
//! │  ┌───────▼─────┐  ┌──────▼──────┐   ┌───────▼──────┐                  │
//! │  │  store      │  │  events     │   │  report      │                  │
//! │  │  LedgerStore│  │  broadcast  │   │  revenue,    │                  │
//! │  │  (Database) │  │  EventBus   │   │  reservations│                  │
//! │  └─────────────┘  └─────────────┘   └──────────────┘                  │
//! │                                                                         │
//! │  config (ledger.toml + TILL_* env)   error (EngineError + ErrorCode)   │
//! │  telemetry (tracing subscriber)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_ledger::{LedgerConfig, LedgerEngine};
//! use till_core::{CandidateDocument, DocumentBody, Money, PaymentMethod};
//!
//! let config = LedgerConfig::load(None)?;
//! let engine = LedgerEngine::open(&config).await?;
//!
//! engine.open_session("c1", "Fatou", Money::from_cents(5000)).await?;
//! let invoice = engine
//!     .confirm(CandidateDocument::new(body), PaymentMethod::Cash)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod report;
pub mod store;
pub mod telemetry;

mod state;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::LedgerConfig;
pub use engine::{DocumentListing, LedgerEngine};
pub use error::{EngineError, EngineResult, ErrorCode, ErrorResponse};
pub use events::{EventBus, LedgerEvent};
pub use report::{Reservation, RevenueSummary};
pub use store::LedgerStore;
