//! # Ledger Commit
//!
//! A change set produced by one ledger operation.
//!
//! ```text
//! operation ──► LedgerCommit ──► durable store (one transaction)
//!                     │                    │
//!                     │               commit ok?
//!                     │                    │
//!                     └──────► apply to memory ──► publish events
//! ```
//!
//! Nothing in memory changes until the durable store has accepted the
//! whole commit.

use crate::document::SaleDocument;
use crate::sequence::InvoiceSequence;
use crate::session::{CashSession, CashSessionLedger};
use crate::store::DocumentStore;
use crate::types::DocumentId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerCommit {
    pub documents: Vec<SaleDocument>,
    pub deleted: Vec<DocumentId>,
    pub sessions: Vec<CashSession>,
    /// New allocator state, present when a number was drawn.
    pub sequence: Option<InvoiceSequence>,
}

impl LedgerCommit {
    pub fn new() -> Self {
        LedgerCommit::default()
    }

    pub fn upsert_document(mut self, doc: SaleDocument) -> Self {
        self.documents.push(doc);
        self
    }

    pub fn delete_document(mut self, id: DocumentId) -> Self {
        self.deleted.push(id);
        self
    }

    pub fn upsert_session(mut self, session: CashSession) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn with_sequence(mut self, sequence: InvoiceSequence) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
            && self.deleted.is_empty()
            && self.sessions.is_empty()
            && self.sequence.is_none()
    }

    /// Applies the change set to in-memory state and returns the documents
    /// it removed.
    ///
    /// Memory mirrors what the durable store committed, so deletions are not
    /// re-checked here. Callers inspect the returned documents instead.
    #[must_use]
    pub fn apply(
        self,
        documents: &mut DocumentStore,
        sessions: &mut CashSessionLedger,
        sequence: &mut InvoiceSequence,
    ) -> Vec<SaleDocument> {
        let removed = self
            .deleted
            .iter()
            .filter_map(|id| documents.remove(id))
            .collect();
        for doc in self.documents {
            documents.upsert(doc);
        }
        for session in self.sessions {
            sessions.upsert(session);
        }
        if let Some(next) = self.sequence {
            *sequence = next;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentBody;
    use crate::money::Money;
    use crate::session::DrawerPolicy;
    use crate::types::{DocumentStatus, InvoiceNumber, PaymentMethod, SaleItem};
    use chrono::Utc;

    #[test]
    fn test_apply_commit() {
        let mut documents = DocumentStore::new();
        let mut sessions = CashSessionLedger::new(DrawerPolicy::Shared);
        let mut sequence = InvoiceSequence::default();

        let draft = SaleDocument::new_draft(
            DocumentId::from("d1"),
            DocumentBody::new("c1"),
            None,
            Utc::now(),
        )
        .unwrap();
        let session = sessions
            .plan_open("c1", "Fatou", Money::from_cents(1000), Utc::now())
            .unwrap();
        let mut staged = sequence.clone();
        staged.allocate().unwrap();

        let commit = LedgerCommit::new()
            .upsert_document(draft)
            .upsert_session(session.clone())
            .with_sequence(staged);
        assert!(!commit.is_empty());
        let removed = commit.apply(&mut documents, &mut sessions, &mut sequence);

        assert!(removed.is_empty());
        assert_eq!(documents.len(), 1);
        assert_eq!(sessions.current_open(None).unwrap().id, session.id);
        assert_eq!(sequence.next_value(), 2);

        let removed = LedgerCommit::new()
            .delete_document(DocumentId::from("d1"))
            .apply(&mut documents, &mut sessions, &mut sequence);
        assert_eq!(removed.len(), 1);
        assert!(documents.is_empty());
    }

    #[test]
    fn test_apply_mirrors_committed_deletion_of_any_status() {
        let mut documents = DocumentStore::new();
        let mut sessions = CashSessionLedger::new(DrawerPolicy::Shared);
        let mut sequence = InvoiceSequence::default();

        let mut body = DocumentBody::new("c1");
        body.add_item(SaleItem {
            product_id: "p1".into(),
            name: "Tea".into(),
            unit_price: Money::from_cents(100),
            quantity: 1,
        })
        .unwrap();
        let invoice = SaleDocument::new_invoice(
            DocumentId::from("i1"),
            body,
            InvoiceNumber::from("INV-0001"),
            PaymentMethod::Card,
            Utc::now(),
        )
        .unwrap();
        documents.upsert(invoice);

        // The store's own delete refuses a posted invoice...
        assert!(documents.delete(&DocumentId::from("i1")).is_err());

        // ...but a committed deletion is mirrored and handed back.
        let removed = LedgerCommit::new()
            .delete_document(DocumentId::from("i1"))
            .delete_document(DocumentId::from("missing"))
            .apply(&mut documents, &mut sessions, &mut sequence);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].status(), DocumentStatus::Confirmed);
        assert!(documents.is_empty());
    }
}
