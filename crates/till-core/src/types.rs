//! # Domain Types
//!
//! Identifiers, catalog snapshots and status enums shared by every ledger
//! component.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    SaleItem     │   │ EventReservation│       │
//! │  │  (catalog, RO)  │──►│  ─────────────  │   │  ─────────────  │       │
//! │  │  id, sku, name  │   │  product_id     │   │  event_date     │       │
//! │  │  price, stock   │   │  name (frozen)  │   │  event_type     │       │
//! │  └─────────────────┘   │  price (frozen) │   │  guest_count    │       │
//! │                        │  quantity       │   │  venue          │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ DocumentStatus  │   │  InvoiceStatus  │   │ PaymentMethod   │       │
//! │  │  Draft          │   │  Unposted       │   │  Cash           │       │
//! │  │  Quotation      │   │  Posted         │   │  Card           │       │
//! │  │  Confirmed      │   │  Refunded       │   │  MobileMoney    │       │
//! │  │  Refunded       │   └─────────────────┘   │  Transfer       │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every sale document has:
//! - `id`: immutable identifier chosen at creation, used for every lookup
//! - `invoice_number`: business number drawn from the sequence on posting

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier.
            pub fn from_string(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a sale document, stable across every status change.
    DocumentId
);

string_id!(
    /// Identifier of a cash drawer session.
    SessionId
);

string_id!(
    /// A posted invoice number such as `INV-0001`.
    ///
    /// Only the sequence allocator creates these for new documents; the
    /// store reloads existing ones with [`InvoiceNumber::from_string`].
    InvoiceNumber
);

impl DocumentId {
    /// Generates a fresh identifier (UUID v4).
    pub fn generate() -> Self {
        DocumentId(Uuid::new_v4().to_string())
    }
}

impl SessionId {
    /// Generates a fresh identifier (UUID v4).
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry, read-only to the ledger.
///
/// Owned by the catalog collaborator. The ledger only snapshots it into
/// [`SaleItem`]s and never writes price or stock back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub stock: i64,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line on a sale document.
///
/// Uses the snapshot pattern: name and unit price are frozen when the line
/// is captured, so a later catalog price change never alters history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    /// Unit price at time of sale (frozen).
    pub unit_price: Money,
    /// Quantity sold, 1..=999.
    pub quantity: i64,
}

impl SaleItem {
    /// Captures a catalog product into a line.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        SaleItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
        }
    }

    /// Line total (unit price × quantity).
    ///
    /// Inputs are validated (price ≥ 0, quantity ≤ 999) before a document
    /// is accepted; saturating keeps the arithmetic total on anything else.
    pub fn line_total(&self) -> Money {
        self.unit_price
            .checked_multiply_quantity(self.quantity)
            .unwrap_or(Money::from_cents(i64::MAX))
    }
}

// =============================================================================
// Event Reservation
// =============================================================================

/// Event metadata carried by a reservation-style quotation (wedding,
/// corporate lunch, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventReservation {
    #[ts(as = "String")]
    pub event_date: NaiveDate,
    pub event_type: String,
    pub guest_count: u32,
    pub venue: Option<String>,
}

// =============================================================================
// Document Status
// =============================================================================

/// Lifecycle status of a sale document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Open ticket, freely editable and deletable.
    Draft,
    /// Estimate or event reservation, no financial standing.
    Quotation,
    /// Posted invoice with a sequence number.
    Confirmed,
    /// Posted invoice reversed by a credit note.
    Refunded,
}

impl DocumentStatus {
    /// Returns the lowercase name used in storage and messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Quotation => "quotation",
            DocumentStatus::Confirmed => "confirmed",
            DocumentStatus::Refunded => "refunded",
        }
    }

    /// True for statuses that carry an invoice number.
    pub const fn is_posted(&self) -> bool {
        matches!(self, DocumentStatus::Confirmed | DocumentStatus::Refunded)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Accounting status of the invoice side of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unposted,
    Posted,
    Refunded,
}

impl From<DocumentStatus> for InvoiceStatus {
    fn from(status: DocumentStatus) -> Self {
        match status {
            DocumentStatus::Draft | DocumentStatus::Quotation => InvoiceStatus::Unposted,
            DocumentStatus::Confirmed => InvoiceStatus::Posted,
            DocumentStatus::Refunded => InvoiceStatus::Refunded,
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash, moves the drawer.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Mobile wallet transfer.
    MobileMoney,
    /// Bank transfer (event deposits, corporate accounts).
    Transfer,
}

impl PaymentMethod {
    /// Only cash settlements touch the cash drawer.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// Status of a cash drawer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

// =============================================================================
// Timestamps
// =============================================================================

/// Timestamp type used across the ledger.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// Unit Tests
// =============================================================================
