//! # Sale Documents
//!
//! The tagged `SaleDocument` and the pure transitions between its states.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Sale Document Lifecycle                            │
//! │                                                                         │
//! │   (new) ──save draft──► Draft ──confirm──────────┐                     │
//! │     │                     │                      ▼                     │
//! │     │                  discard              Confirmed ──refund──► Refunded
//! │     │                     ▼                      ▲   │                 │
//! │     │                 (deleted)                  │   └─ correction     │
//! │     │                                            │      (same number)  │
//! │     └──save quotation──► Quotation ──convert─────┘                     │
//! │                                                                         │
//! │  Draft / Quotation : no invoice number field exists on the type        │
//! │  Confirmed         : invoice number assigned exactly once              │
//! │  Refunded          : keeps the posted invoice (number and total)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries only the fields that are valid in that state, so an
//! unposted document with an invoice number cannot be represented.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::money::Money;
use crate::types::{
    DocumentId, DocumentStatus, EventReservation, InvoiceNumber, InvoiceStatus, PaymentMethod,
    SaleItem, Timestamp,
};
use crate::validation::{
    validate_customer, validate_customer_length, validate_event, validate_identifier,
    validate_item, validate_items, validate_items_for_posting, validate_quantity,
    ValidationResult,
};
use crate::{MAX_DOCUMENT_ITEMS, WALK_IN_CUSTOMER};

// =============================================================================
// Document Body
// =============================================================================

/// Commercial content shared by every document state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentBody {
    pub customer: String,
    /// Lines in insertion order.
    pub items: Vec<SaleItem>,
    pub cashier_id: String,
    /// Table or room tag ("Terrace 4").
    pub location: Option<String>,
    pub event: Option<EventReservation>,
}

impl DocumentBody {
    /// Empty body for a cashier, with no customer yet.
    pub fn new(cashier_id: impl Into<String>) -> Self {
        DocumentBody {
            customer: String::new(),
            items: Vec::new(),
            cashier_id: cashier_id.into(),
            location: None,
            event: None,
        }
    }

    /// Sum of line totals. Never stored, always recomputed.
    ///
    /// Saturates on unvalidated input. Validated bodies stay far below the
    /// bound because unit prices are capped at `MAX_UNIT_PRICE`.
    pub fn total(&self) -> Money {
        self.items
            .iter()
            .map(SaleItem::line_total)
            .fold(Money::zero(), |acc, line| acc.saturating_add(line))
    }

    /// Adds a line, merging quantities when the product is already present.
    ///
    /// The merged line keeps its original captured price.
    pub fn add_item(&mut self, item: SaleItem) -> ValidationResult<()> {
        match self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            Some(line) => {
                let merged = line.quantity.saturating_add(item.quantity);
                validate_quantity(merged)?;
                line.quantity = merged;
            }
            None => {
                validate_item(&item)?;
                if self.items.len() >= MAX_DOCUMENT_ITEMS {
                    return Err(ValidationError::OutOfRange {
                        field: "items".to_string(),
                        min: 0,
                        max: MAX_DOCUMENT_ITEMS as i64,
                    });
                }
                self.items.push(item);
            }
        }
        Ok(())
    }

    /// Rules common to every state: cashier, customer length, lines, event.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_identifier("cashier_id", &self.cashier_id)?;
        validate_customer_length(&self.customer)?;
        validate_items(&self.items)?;
        if let Some(event) = &self.event {
            validate_event(event)?;
        }
        Ok(())
    }

    /// Additional rules for quotations: a named customer is mandatory.
    pub fn validate_for_quotation(&self) -> ValidationResult<()> {
        self.validate()?;
        validate_customer(&self.customer)
    }

    /// Additional rules for invoices: at least one line.
    pub fn validate_for_posting(&self) -> ValidationResult<()> {
        self.validate()?;
        validate_items_for_posting(&self.items)
    }

    /// Trims the customer and substitutes the walk-in name when empty.
    fn with_default_customer(mut self) -> Self {
        let trimmed = self.customer.trim();
        self.customer = if trimmed.is_empty() {
            WALK_IN_CUSTOMER.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }

    fn with_trimmed_customer(mut self) -> Self {
        self.customer = self.customer.trim().to_string();
        self
    }
}

// =============================================================================
// Candidate Document
// =============================================================================

/// What a terminal submits: content plus an optional existing identifier.
///
/// With no id (or an id the ledger has never seen) the submission creates a
/// new document. With a known id it targets that document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CandidateDocument {
    pub id: Option<DocumentId>,
    pub body: DocumentBody,
}

impl CandidateDocument {
    pub fn new(body: DocumentBody) -> Self {
        CandidateDocument { id: None, body }
    }

    pub fn with_id(id: impl Into<DocumentId>, body: DocumentBody) -> Self {
        CandidateDocument {
            id: Some(id.into()),
            body,
        }
    }
}

// =============================================================================
// State Payloads
// =============================================================================

/// An unposted document: a draft ticket or a quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ticket {
    pub id: DocumentId,
    pub body: DocumentBody,
    pub payment_method: Option<PaymentMethod>,
    #[ts(as = "String")]
    pub created_at: Timestamp,
}

/// A posted invoice bearing its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PostedInvoice {
    pub id: DocumentId,
    pub body: DocumentBody,
    pub invoice_number: InvoiceNumber,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: Timestamp,
    /// Confirmation time. For a converted quotation this is the conversion
    /// time, not the quotation's creation time.
    #[ts(as = "String")]
    pub issued_at: Timestamp,
}

impl PostedInvoice {
    /// Drawer contribution of this invoice while it stands.
    pub fn cash_impact(&self) -> Money {
        if self.payment_method.is_cash() {
            self.body.total()
        } else {
            Money::zero()
        }
    }
}

/// A posted invoice reversed by a credit note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundedInvoice {
    /// The invoice as it stood when refunded; number and total unchanged.
    pub invoice: PostedInvoice,
    #[ts(as = "String")]
    pub refunded_at: Timestamp,
    pub refunded_by: String,
}

// =============================================================================
// Sale Document
// =============================================================================

/// A sale document in exactly one lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaleDocument {
    Draft(Ticket),
    Quotation(Ticket),
    Confirmed(PostedInvoice),
    Refunded(RefundedInvoice),
}

impl SaleDocument {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Builds a new draft. An empty customer becomes the walk-in name.
    pub fn new_draft(
        id: DocumentId,
        body: DocumentBody,
        payment_method: Option<PaymentMethod>,
        now: Timestamp,
    ) -> LedgerResult<Self> {
        body.validate()?;
        Ok(SaleDocument::Draft(Ticket {
            id,
            body: body.with_default_customer(),
            payment_method,
            created_at: now,
        }))
    }

    /// Builds a new quotation. The customer is mandatory.
    pub fn new_quotation(
        id: DocumentId,
        body: DocumentBody,
        payment_method: Option<PaymentMethod>,
        now: Timestamp,
    ) -> LedgerResult<Self> {
        body.validate_for_quotation()?;
        Ok(SaleDocument::Quotation(Ticket {
            id,
            body: body.with_trimmed_customer(),
            payment_method,
            created_at: now,
        }))
    }

    /// Builds an invoice confirmed directly from a new candidate.
    ///
    /// Callers validate with [`DocumentBody::validate_for_posting`] before
    /// drawing `invoice_number`, so a rejected body never consumes one.
    pub fn new_invoice(
        id: DocumentId,
        body: DocumentBody,
        invoice_number: InvoiceNumber,
        payment_method: PaymentMethod,
        now: Timestamp,
    ) -> LedgerResult<Self> {
        body.validate_for_posting()?;
        Ok(SaleDocument::Confirmed(PostedInvoice {
            id,
            body: body.with_default_customer(),
            invoice_number,
            payment_method,
            created_at: now,
            issued_at: now,
        }))
    }

    // -------------------------------------------------------------------------
    // Derived Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> &DocumentId {
        match self {
            SaleDocument::Draft(t) | SaleDocument::Quotation(t) => &t.id,
            SaleDocument::Confirmed(inv) => &inv.id,
            SaleDocument::Refunded(r) => &r.invoice.id,
        }
    }

    pub fn status(&self) -> DocumentStatus {
        match self {
            SaleDocument::Draft(_) => DocumentStatus::Draft,
            SaleDocument::Quotation(_) => DocumentStatus::Quotation,
            SaleDocument::Confirmed(_) => DocumentStatus::Confirmed,
            SaleDocument::Refunded(_) => DocumentStatus::Refunded,
        }
    }

    pub fn invoice_status(&self) -> InvoiceStatus {
        InvoiceStatus::from(self.status())
    }

    /// The invoice number, present only once posted.
    pub fn invoice_number(&self) -> Option<&InvoiceNumber> {
        match self {
            SaleDocument::Draft(_) | SaleDocument::Quotation(_) => None,
            SaleDocument::Confirmed(inv) => Some(&inv.invoice_number),
            SaleDocument::Refunded(r) => Some(&r.invoice.invoice_number),
        }
    }

    pub fn body(&self) -> &DocumentBody {
        match self {
            SaleDocument::Draft(t) | SaleDocument::Quotation(t) => &t.body,
            SaleDocument::Confirmed(inv) => &inv.body,
            SaleDocument::Refunded(r) => &r.invoice.body,
        }
    }

    pub fn total(&self) -> Money {
        self.body().total()
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        match self {
            SaleDocument::Draft(t) | SaleDocument::Quotation(t) => t.payment_method,
            SaleDocument::Confirmed(inv) => Some(inv.payment_method),
            SaleDocument::Refunded(r) => Some(r.invoice.payment_method),
        }
    }

    pub fn created_at(&self) -> Timestamp {
        match self {
            SaleDocument::Draft(t) | SaleDocument::Quotation(t) => t.created_at,
            SaleDocument::Confirmed(inv) => inv.created_at,
            SaleDocument::Refunded(r) => r.invoice.created_at,
        }
    }

    pub fn issued_at(&self) -> Option<Timestamp> {
        match self {
            SaleDocument::Draft(_) | SaleDocument::Quotation(_) => None,
            SaleDocument::Confirmed(inv) => Some(inv.issued_at),
            SaleDocument::Refunded(r) => Some(r.invoice.issued_at),
        }
    }

    /// Issue time for posted documents, creation time otherwise.
    /// Date filters and journal ordering use this.
    pub fn reference_time(&self) -> Timestamp {
        self.issued_at().unwrap_or_else(|| self.created_at())
    }

    /// What this document currently contributes to a cash drawer.
    pub fn cash_impact(&self) -> Money {
        match self {
            SaleDocument::Confirmed(inv) => inv.cash_impact(),
            _ => Money::zero(),
        }
    }

    pub fn as_posted(&self) -> Option<&PostedInvoice> {
        match self {
            SaleDocument::Confirmed(inv) => Some(inv),
            SaleDocument::Refunded(r) => Some(&r.invoice),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Replaces content of a draft or quotation in place, keeping its state.
    ///
    /// For a confirmed invoice use [`SaleDocument::correct`].
    pub fn revise(
        &self,
        body: DocumentBody,
        payment_method: Option<PaymentMethod>,
    ) -> LedgerResult<Self> {
        match self {
            SaleDocument::Draft(t) => {
                body.validate()?;
                Ok(SaleDocument::Draft(Ticket {
                    body: body.with_default_customer(),
                    payment_method: payment_method.or(t.payment_method),
                    ..t.clone()
                }))
            }
            SaleDocument::Quotation(t) => {
                body.validate_for_quotation()?;
                Ok(SaleDocument::Quotation(Ticket {
                    body: body.with_trimmed_customer(),
                    payment_method: payment_method.or(t.payment_method),
                    ..t.clone()
                }))
            }
            SaleDocument::Confirmed(_) => self.correct(body, payment_method),
            SaleDocument::Refunded(_) => Err(self.reject("edit")),
        }
    }

    /// Corrects a posted invoice: content and payment method change, the
    /// invoice number, status and issue date do not.
    pub fn correct(
        &self,
        body: DocumentBody,
        payment_method: Option<PaymentMethod>,
    ) -> LedgerResult<Self> {
        match self {
            SaleDocument::Confirmed(inv) => {
                body.validate_for_posting()?;
                Ok(SaleDocument::Confirmed(PostedInvoice {
                    body: body.with_default_customer(),
                    payment_method: payment_method.unwrap_or(inv.payment_method),
                    ..inv.clone()
                }))
            }
            _ => Err(self.reject("correct")),
        }
    }

    /// Checks that the document can be posted with its current content.
    ///
    /// Run before drawing a number from the sequence.
    pub fn check_postable(&self) -> LedgerResult<()> {
        match self {
            SaleDocument::Draft(t) | SaleDocument::Quotation(t) => {
                t.body.validate_for_posting()?;
                Ok(())
            }
            _ => Err(self.reject("confirm")),
        }
    }

    /// Posts a draft or quotation with a freshly allocated number.
    ///
    /// The issue date is stamped to `now`.
    pub fn post(
        &self,
        invoice_number: InvoiceNumber,
        payment_method: PaymentMethod,
        now: Timestamp,
    ) -> LedgerResult<Self> {
        match self {
            SaleDocument::Draft(t) | SaleDocument::Quotation(t) => {
                t.body.validate_for_posting()?;
                Ok(SaleDocument::Confirmed(PostedInvoice {
                    id: t.id.clone(),
                    body: t.body.clone().with_default_customer(),
                    invoice_number,
                    payment_method,
                    created_at: t.created_at,
                    issued_at: now,
                }))
            }
            _ => Err(self.reject("confirm")),
        }
    }

    /// Reverses a confirmed invoice. The number and total are retained.
    pub fn refund(&self, refunded_by: &str, now: Timestamp) -> LedgerResult<Self> {
        match self {
            SaleDocument::Confirmed(inv) => {
                validate_identifier("refunded_by", refunded_by)?;
                Ok(SaleDocument::Refunded(RefundedInvoice {
                    invoice: inv.clone(),
                    refunded_at: now,
                    refunded_by: refunded_by.to_string(),
                }))
            }
            SaleDocument::Refunded(r) => Err(LedgerError::AlreadyRefunded {
                document_id: r.invoice.id.to_string(),
                invoice_number: r.invoice.invoice_number.to_string(),
            }),
            _ => Err(self.reject("refund")),
        }
    }

    /// Only drafts may be deleted.
    pub fn ensure_discardable(&self) -> LedgerResult<()> {
        match self {
            SaleDocument::Draft(_) => Ok(()),
            _ => Err(self.reject("delete")),
        }
    }

    fn reject(&self, operation: &'static str) -> LedgerError {
        LedgerError::invalid_transition(self.id().as_str(), self.status(), operation)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    fn line(product: &str, cents: i64, qty: i64) -> SaleItem {
        SaleItem {
            product_id: product.to_string(),
            name: product.to_uppercase(),
            unit_price: Money::from_cents(cents),
            quantity: qty,
        }
    }

    fn body(items: Vec<SaleItem>) -> DocumentBody {
        DocumentBody {
            customer: "Awa".to_string(),
            items,
            ..DocumentBody::new("cashier-1")
        }
    }

    #[test]
    fn test_total_is_derived_from_items() {
        let mut b = body(vec![line("a", 150, 1), line("b", 100, 3)]);
        assert_eq!(b.total().cents(), 450);

        b.items.pop();
        assert_eq!(b.total().cents(), 150);
    }

    #[test]
    fn test_add_item_merges_same_product() {
        let mut b = body(vec![line("a", 150, 1)]);
        b.add_item(line("a", 999, 2)).unwrap();
        b.add_item(line("b", 100, 1)).unwrap();

        assert_eq!(b.items.len(), 2);
        assert_eq!(b.items[0].quantity, 3);
        // Captured price of the existing line wins.
        assert_eq!(b.items[0].unit_price.cents(), 150);
        assert!(b.add_item(line("a", 150, 999)).is_err());
    }

    #[test]
    fn test_draft_defaults_customer_to_walk_in() {
        let mut b = body(vec![]);
        b.customer = "  ".to_string();
        let doc = SaleDocument::new_draft(DocumentId::from("D1"), b, None, at(9)).unwrap();

        assert_eq!(doc.body().customer, WALK_IN_CUSTOMER);
        assert_eq!(doc.status(), DocumentStatus::Draft);
        assert!(doc.invoice_number().is_none());
    }

    #[test]
    fn test_quotation_requires_customer() {
        let mut b = body(vec![]);
        b.customer = String::new();
        let err = SaleDocument::new_quotation(DocumentId::from("Q1"), b, None, at(9)).unwrap_err();
        assert_eq!(err, LedgerError::Validation(ValidationError::required("customer")));
    }

    #[test]
    fn test_post_quotation_restamps_issue_date() {
        let q = SaleDocument::new_quotation(
            DocumentId::from("Q1"),
            body(vec![line("a", 300, 2)]),
            None,
            at(9),
        )
        .unwrap();

        let posted = q
            .post(InvoiceNumber::from("INV-0001"), PaymentMethod::Cash, at(15))
            .unwrap();

        assert_eq!(posted.status(), DocumentStatus::Confirmed);
        assert_eq!(posted.invoice_status(), InvoiceStatus::Posted);
        assert_eq!(posted.created_at(), at(9));
        assert_eq!(posted.issued_at(), Some(at(15)));
        assert_eq!(posted.total().cents(), 600);
        assert_eq!(posted.cash_impact().cents(), 600);
    }

    #[test]
    fn test_post_rejects_empty_items() {
        let q = SaleDocument::new_quotation(DocumentId::from("Q1"), body(vec![]), None, at(9))
            .unwrap();
        assert!(q.check_postable().is_err());
        assert!(matches!(
            q.post(InvoiceNumber::from("INV-0001"), PaymentMethod::Cash, at(10)),
            Err(LedgerError::Validation(ValidationError::Empty { .. }))
        ));
    }

    #[test]
    fn test_correction_keeps_number_and_issue_date() {
        let inv = SaleDocument::new_invoice(
            DocumentId::from("D1"),
            body(vec![line("a", 300, 1)]),
            InvoiceNumber::from("INV-0007"),
            PaymentMethod::Card,
            at(10),
        )
        .unwrap();

        let corrected = inv
            .revise(body(vec![line("a", 300, 2)]), Some(PaymentMethod::Cash))
            .unwrap();

        assert_eq!(corrected.invoice_number().unwrap().as_str(), "INV-0007");
        assert_eq!(corrected.issued_at(), Some(at(10)));
        assert_eq!(corrected.payment_method(), Some(PaymentMethod::Cash));
        assert_eq!(corrected.total().cents(), 600);
    }

    #[test]
    fn test_refund_retains_invoice_and_rejects_second_refund() {
        let inv = SaleDocument::new_invoice(
            DocumentId::from("D1"),
            body(vec![line("a", 150, 3)]),
            InvoiceNumber::from("INV-0001"),
            PaymentMethod::Cash,
            at(10),
        )
        .unwrap();

        let refunded = inv.refund("manager-1", at(11)).unwrap();
        assert_eq!(refunded.status(), DocumentStatus::Refunded);
        assert_eq!(refunded.invoice_number().unwrap().as_str(), "INV-0001");
        assert_eq!(refunded.total().cents(), 450);
        assert_eq!(refunded.cash_impact(), Money::zero());

        assert!(matches!(
            refunded.refund("manager-1", at(12)),
            Err(LedgerError::AlreadyRefunded { .. })
        ));
        assert!(matches!(
            refunded.revise(body(vec![]), None),
            Err(LedgerError::InvalidTransition { operation: "edit", .. })
        ));
    }

    #[test]
    fn test_only_drafts_are_discardable() {
        let draft =
            SaleDocument::new_draft(DocumentId::from("D1"), body(vec![]), None, at(9)).unwrap();
        assert!(draft.ensure_discardable().is_ok());

        let quotation =
            SaleDocument::new_quotation(DocumentId::from("Q1"), body(vec![]), None, at(9))
                .unwrap();
        assert!(matches!(
            quotation.ensure_discardable(),
            Err(LedgerError::InvalidTransition {
                status: DocumentStatus::Quotation,
                ..
            })
        ));
        assert!(quotation.refund("m", at(10)).is_err());
    }

    #[test]
    fn test_serde_tags_document_status() {
        let draft = SaleDocument::new_draft(
            DocumentId::from("D1"),
            body(vec![line("a", 100, 1)]),
            None,
            at(9) + Duration::minutes(5),
        )
        .unwrap();

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["status"], "draft");
        assert!(json.get("invoice_number").is_none());

        let back: SaleDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, draft);
    }
}
