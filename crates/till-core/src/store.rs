//! # Sale Document Store
//!
//! In-memory set of sale documents keyed by identifier, kept in insertion
//! order, plus the filter used by reporting listings.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::SaleDocument;
use crate::error::{LedgerError, LedgerResult};
use crate::validation::{validate_search_query, ValidationResult};
use crate::types::{DocumentId, DocumentStatus, InvoiceNumber};

// =============================================================================
// Document Filter
// =============================================================================

/// Predicate for listings.
///
/// Every criterion is optional. Dates are inclusive and compare against the
/// issue date of posted documents and the creation date of the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    /// Case-insensitive match on customer, document id or invoice number.
    pub text: Option<String>,
    /// Empty means every status.
    pub statuses: Vec<DocumentStatus>,
}

impl DocumentFilter {
    pub fn all() -> Self {
        DocumentFilter::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        DocumentFilter {
            from: Some(from),
            to: Some(to),
            ..DocumentFilter::default()
        }
    }

    /// Adds free text. Blank text clears the criterion; overlong text is
    /// refused.
    pub fn with_text(mut self, text: &str) -> ValidationResult<Self> {
        let text = validate_search_query(text)?;
        self.text = (!text.is_empty()).then_some(text);
        Ok(self)
    }

    pub fn with_statuses(mut self, statuses: &[DocumentStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn matches(&self, doc: &SaleDocument) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&doc.status()) {
            return false;
        }

        let day = doc.reference_time().date_naive();
        if self.from.is_some_and(|from| day < from) || self.to.is_some_and(|to| day > to) {
            return false;
        }

        match &self.text {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                doc.body().customer.to_lowercase().contains(&needle)
                    || doc.id().as_str().to_lowercase().contains(&needle)
                    || doc
                        .invoice_number()
                        .is_some_and(|n| n.as_str().to_lowercase().contains(&needle))
            }
        }
    }
}

// =============================================================================
// Document Store
// =============================================================================

/// Documents by id, iterated in the order they were first stored.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    slots: BTreeMap<u64, SaleDocument>,
    index: HashMap<DocumentId, u64>,
    next_slot: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        DocumentStore::default()
    }

    /// Builds a store from documents in the order given.
    pub fn from_documents(documents: impl IntoIterator<Item = SaleDocument>) -> Self {
        let mut store = DocumentStore::new();
        for doc in documents {
            store.upsert(doc);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: &DocumentId) -> LedgerResult<&SaleDocument> {
        self.find(id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    pub fn find(&self, id: &DocumentId) -> Option<&SaleDocument> {
        self.index.get(id).and_then(|slot| self.slots.get(slot))
    }

    /// Inserts a new document or replaces the one with the same id.
    /// A replaced document keeps its position.
    pub fn upsert(&mut self, doc: SaleDocument) {
        match self.index.get(doc.id()) {
            Some(slot) => {
                self.slots.insert(*slot, doc);
            }
            None => {
                let slot = self.next_slot;
                self.next_slot += 1;
                self.index.insert(doc.id().clone(), slot);
                self.slots.insert(slot, doc);
            }
        }
    }

    /// Removes a draft. Any other status is refused with `InvalidTransition`.
    pub fn delete(&mut self, id: &DocumentId) -> LedgerResult<SaleDocument> {
        self.get(id)?.ensure_discardable()?;
        self.remove(id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    /// Removes a document whatever its status.
    ///
    /// Used to mirror a deletion the durable store already committed.
    pub fn remove(&mut self, id: &DocumentId) -> Option<SaleDocument> {
        let slot = self.index.remove(id)?;
        self.slots.remove(&slot)
    }

    /// Lazily yields matching documents. Each call starts a fresh pass.
    pub fn list<'a>(
        &'a self,
        filter: &'a DocumentFilter,
    ) -> impl Iterator<Item = &'a SaleDocument> + 'a {
        self.slots.values().filter(move |doc| filter.matches(doc))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SaleDocument> {
        self.slots.values()
    }

    /// True when some stored document carries this invoice number.
    pub fn contains_invoice_number(&self, number: &InvoiceNumber) -> bool {
        self.slots
            .values()
            .any(|doc| doc.invoice_number() == Some(number))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentBody;
    use crate::money::Money;
    use crate::types::{PaymentMethod, SaleItem, Timestamp};
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, d, 12, 0, 0).unwrap()
    }

    fn body(customer: &str) -> DocumentBody {
        DocumentBody {
            customer: customer.to_string(),
            items: vec![SaleItem {
                product_id: "p".to_string(),
                name: "Alloco".to_string(),
                unit_price: Money::from_cents(250),
                quantity: 1,
            }],
            ..DocumentBody::new("c1")
        }
    }

    fn draft(id: &str, customer: &str, d: u32) -> SaleDocument {
        SaleDocument::new_draft(DocumentId::from(id), body(customer), None, day(d)).unwrap()
    }

    fn invoice(id: &str, number: &str, d: u32) -> SaleDocument {
        SaleDocument::new_invoice(
            DocumentId::from(id),
            body("Kouassi"),
            InvoiceNumber::from(number),
            PaymentMethod::Card,
            day(d),
        )
        .unwrap()
    }

    #[test]
    fn test_upsert_keeps_insertion_order() {
        let mut store = DocumentStore::new();
        store.upsert(draft("a", "Awa", 1));
        store.upsert(draft("b", "Ben", 2));
        store.upsert(draft("a", "Awa Kone", 3));

        let ids: Vec<_> = store.iter().map(|d| d.id().as_str().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.get(&DocumentId::from("a")).unwrap().body().customer, "Awa Kone");
    }

    #[test]
    fn test_delete_draft_removes_it_from_listing() {
        let mut store = DocumentStore::from_documents([draft("a", "Awa", 1)]);
        store.delete(&DocumentId::from("a")).unwrap();

        assert!(store.is_empty());
        assert_eq!(store.list(&DocumentFilter::all()).count(), 0);
        assert_eq!(
            store.get(&DocumentId::from("a")),
            Err(LedgerError::NotFound("a".to_string()))
        );
    }

    #[test]
    fn test_delete_confirmed_is_refused() {
        let mut store = DocumentStore::from_documents([invoice("x", "INV-0001", 1)]);
        let err = store.delete(&DocumentId::from("x")).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                status: DocumentStatus::Confirmed,
                ..
            }
        ));
        assert!(store.get(&DocumentId::from("x")).is_ok());
    }

    #[test]
    fn test_filter_by_text_and_date() {
        let store = DocumentStore::from_documents([
            draft("a", "Awa", 1),
            draft("b", "Ben", 5),
            invoice("c", "INV-0009", 9),
        ]);

        let by_name = DocumentFilter::all().with_text("AWA").unwrap();
        assert_eq!(store.list(&by_name).count(), 1);

        let by_number = DocumentFilter::all().with_text("inv-0009").unwrap();
        assert_eq!(store.list(&by_number).next().unwrap().id().as_str(), "c");

        let window = DocumentFilter::between(
            NaiveDate::from_ymd_opt(2026, 5, 5).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 9).unwrap(),
        );
        assert_eq!(store.list(&window).count(), 2);

        let posted = DocumentFilter::all().with_statuses(&[DocumentStatus::Confirmed]);
        assert_eq!(store.list(&posted).count(), 1);
    }

    #[test]
    fn test_filter_text_is_trimmed_and_capped() {
        assert_eq!(DocumentFilter::all().with_text("   ").unwrap().text, None);
        assert_eq!(
            DocumentFilter::all().with_text(" Awa ").unwrap().text.as_deref(),
            Some("Awa")
        );
        assert!(DocumentFilter::all().with_text(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_listing_is_restartable() {
        let store = DocumentStore::from_documents([draft("a", "Awa", 1), draft("b", "Ben", 2)]);
        let filter = DocumentFilter::all();

        let mut first = store.list(&filter);
        assert!(first.next().is_some());
        assert_eq!(store.list(&filter).count(), 2);
    }

    #[test]
    fn test_contains_invoice_number() {
        let store = DocumentStore::from_documents([invoice("c", "INV-0009", 9)]);
        assert!(store.contains_invoice_number(&InvoiceNumber::from("INV-0009")));
        assert!(!store.contains_invoice_number(&InvoiceNumber::from("INV-0010")));
    }
}
