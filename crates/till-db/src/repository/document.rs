//! # Document Repository
//!
//! Durable storage of sale documents and their lines.
//!
//! ## Row Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleDocument variant        sale_documents row                         │
//! │  ─────────────────────       ─────────────────────────────────────      │
//! │  Draft / Quotation           invoice_number NULL, issued_at NULL        │
//! │  Confirmed                   invoice_number, issued_at, payment set     │
//! │  Refunded                    + refunded_at, refunded_by                 │
//! │                                                                         │
//! │  DocumentBody.items     ──►  sale_document_items (line_no = position)  │
//! │  total                  ──►  never stored, recomputed on load          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{
    DocumentBody, DocumentId, DocumentStatus, EventReservation, InvoiceNumber, Money,
    PaymentMethod, PostedInvoice, RefundedInvoice, SaleDocument, SaleItem, Ticket,
};

const ENTITY: &str = "SaleDocument";

const SELECT_DOCUMENTS: &str = r#"
    SELECT
        id, status, invoice_number, customer, cashier_id, location,
        payment_method, event_date, event_type, guest_count, venue,
        created_at, issued_at, refunded_at, refunded_by
    FROM sale_documents
"#;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    status: DocumentStatus,
    invoice_number: Option<String>,
    customer: String,
    cashier_id: String,
    location: Option<String>,
    payment_method: Option<PaymentMethod>,
    event_date: Option<NaiveDate>,
    event_type: Option<String>,
    guest_count: Option<i64>,
    venue: Option<String>,
    created_at: DateTime<Utc>,
    issued_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    refunded_by: Option<String>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    document_id: String,
    product_id: String,
    name: String,
    unit_price: i64,
    quantity: i64,
}

impl From<ItemRow> for SaleItem {
    fn from(row: ItemRow) -> Self {
        SaleItem {
            product_id: row.product_id,
            name: row.name,
            unit_price: Money::from_cents(row.unit_price),
            quantity: row.quantity,
        }
    }
}

impl DocumentRow {
    /// Rebuilds the tagged document, refusing column combinations that no
    /// variant can hold.
    fn into_document(self, items: Vec<SaleItem>) -> DbResult<SaleDocument> {
        let corrupt = |reason: &str| DbError::corrupt(ENTITY, self.id.clone(), reason);

        let event = match (self.event_date, self.event_type.clone(), self.guest_count) {
            (None, None, None) => None,
            (Some(event_date), Some(event_type), Some(guest_count)) => Some(EventReservation {
                event_date,
                event_type,
                guest_count: u32::try_from(guest_count)
                    .map_err(|_| corrupt("guest_count out of range"))?,
                venue: self.venue.clone(),
            }),
            _ => return Err(corrupt("incomplete event reservation")),
        };

        let id = DocumentId::from(self.id.clone());
        let body = DocumentBody {
            customer: self.customer.clone(),
            items,
            cashier_id: self.cashier_id.clone(),
            location: self.location.clone(),
            event,
        };

        if !self.status.is_posted() {
            if self.invoice_number.is_some() {
                return Err(corrupt("unposted document carries an invoice number"));
            }
            let ticket = Ticket {
                id,
                body,
                payment_method: self.payment_method,
                created_at: self.created_at,
            };
            return Ok(match self.status {
                DocumentStatus::Draft => SaleDocument::Draft(ticket),
                _ => SaleDocument::Quotation(ticket),
            });
        }

        let invoice = PostedInvoice {
            id,
            body,
            invoice_number: self
                .invoice_number
                .clone()
                .map(InvoiceNumber::from)
                .ok_or_else(|| corrupt("posted document without invoice number"))?,
            payment_method: self
                .payment_method
                .ok_or_else(|| corrupt("posted document without payment method"))?,
            created_at: self.created_at,
            issued_at: self
                .issued_at
                .ok_or_else(|| corrupt("posted document without issue date"))?,
        };

        match self.status {
            DocumentStatus::Refunded => Ok(SaleDocument::Refunded(RefundedInvoice {
                invoice,
                refunded_at: self
                    .refunded_at
                    .ok_or_else(|| corrupt("refunded document without refund date"))?,
                refunded_by: self.refunded_by.clone().unwrap_or_default(),
            })),
            _ => Ok(SaleDocument::Confirmed(invoice)),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale document database operations.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Loads every document in insertion order.
    pub async fn list_all(&self) -> DbResult<Vec<SaleDocument>> {
        let rows: Vec<DocumentRow> =
            sqlx::query_as(&format!("{SELECT_DOCUMENTS} ORDER BY position"))
                .fetch_all(&self.pool)
                .await?;

        let item_rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT document_id, product_id, name, unit_price, quantity
            FROM sale_document_items
            ORDER BY document_id, line_no
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<String, Vec<SaleItem>> = HashMap::new();
        for row in item_rows {
            items
                .entry(row.document_id.clone())
                .or_default()
                .push(SaleItem::from(row));
        }

        debug!(documents = rows.len(), "Loaded sale documents");

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_document(lines)
            })
            .collect()
    }
}

// =============================================================================
// Transactional Helpers
// =============================================================================

/// Writes a document and replaces its lines on an open connection.
pub(crate) async fn upsert_in(conn: &mut SqliteConnection, doc: &SaleDocument) -> DbResult<()> {
    let body = doc.body();
    let event = body.event.as_ref();
    let refund = match doc {
        SaleDocument::Refunded(r) => Some(r),
        _ => None,
    };

    debug!(
        id = %doc.id(),
        status = %doc.status(),
        items = body.items.len(),
        "Upserting sale document"
    );

    sqlx::query(
        r#"
        INSERT INTO sale_documents (
            id, status, invoice_number, customer, cashier_id, location,
            payment_method, event_date, event_type, guest_count, venue,
            created_at, issued_at, refunded_at, refunded_by
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15
        )
        ON CONFLICT (id) DO UPDATE SET
            status         = excluded.status,
            invoice_number = excluded.invoice_number,
            customer       = excluded.customer,
            cashier_id     = excluded.cashier_id,
            location       = excluded.location,
            payment_method = excluded.payment_method,
            event_date     = excluded.event_date,
            event_type     = excluded.event_type,
            guest_count    = excluded.guest_count,
            venue          = excluded.venue,
            created_at     = excluded.created_at,
            issued_at      = excluded.issued_at,
            refunded_at    = excluded.refunded_at,
            refunded_by    = excluded.refunded_by
        "#,
    )
    .bind(doc.id().as_str())
    .bind(doc.status())
    .bind(doc.invoice_number().map(InvoiceNumber::as_str))
    .bind(&body.customer)
    .bind(&body.cashier_id)
    .bind(body.location.as_deref())
    .bind(doc.payment_method())
    .bind(event.map(|e| e.event_date))
    .bind(event.map(|e| e.event_type.as_str()))
    .bind(event.map(|e| i64::from(e.guest_count)))
    .bind(event.and_then(|e| e.venue.as_deref()))
    .bind(doc.created_at())
    .bind(doc.issued_at())
    .bind(refund.map(|r| r.refunded_at))
    .bind(refund.map(|r| r.refunded_by.as_str()))
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM sale_document_items WHERE document_id = ?1")
        .bind(doc.id().as_str())
        .execute(&mut *conn)
        .await?;

    for (line_no, item) in body.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_document_items (
                document_id, line_no, product_id, name, unit_price, quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(doc.id().as_str())
        .bind(line_no as i64)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.unit_price.cents())
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Deletes a document (its lines cascade) on an open connection.
pub(crate) async fn delete_in(conn: &mut SqliteConnection, id: &DocumentId) -> DbResult<()> {
    debug!(id = %id, "Deleting sale document");

    let result = sqlx::query("DELETE FROM sale_documents WHERE id = ?1")
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(ENTITY, id.as_str()));
    }
    Ok(())
}
