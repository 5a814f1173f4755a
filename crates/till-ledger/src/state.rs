//! # Ledger State
//!
//! The in-memory arena the engine owns: documents, drawers and the invoice
//! sequence. Writes never touch it directly. They read it to plan a
//! [`LedgerCommit`], and the commit is applied once it is durable.
//!
//! Documents sit behind an `Arc` so listings can hold a snapshot while
//! later commits copy on write.

use std::sync::Arc;
use tracing::{debug, warn};

use till_core::{
    CashSession, CashSessionLedger, DocumentStatus, DocumentStore, DrawerPolicy, InvoiceNumber,
    InvoiceSequence, LedgerCommit, LedgerError, LedgerResult, Money,
};
use till_db::LedgerSnapshot;

use crate::config::LedgerConfig;

#[derive(Debug, Clone)]
pub(crate) struct LedgerState {
    pub documents: Arc<DocumentStore>,
    pub sessions: CashSessionLedger,
    pub sequence: InvoiceSequence,
}

impl LedgerState {
    /// Rebuilds state from storage and applies configured sequence values.
    pub fn restore(snapshot: LedgerSnapshot, config: &LedgerConfig) -> Self {
        let settings = &config.sequence;
        let sequence = match snapshot.sequence {
            Some(mut stored) => {
                let before = stored.next_value();
                stored.reseed(
                    &settings.invoice_prefix,
                    settings.next_invoice_number,
                    settings.width,
                );
                if stored.next_value() != before {
                    debug!(
                        from = before,
                        to = stored.next_value(),
                        "Invoice counter moved forward by configuration"
                    );
                }
                stored
            }
            None => settings.to_sequence(),
        };

        LedgerState {
            documents: Arc::new(DocumentStore::from_documents(snapshot.documents)),
            sessions: CashSessionLedger::from_sessions(config.drawer_policy(), snapshot.sessions),
            sequence,
        }
    }

    pub fn apply(&mut self, commit: LedgerCommit) {
        let removed = commit.apply(
            Arc::make_mut(&mut self.documents),
            &mut self.sessions,
            &mut self.sequence,
        );
        for doc in removed.iter().filter(|doc| doc.status() != DocumentStatus::Draft) {
            warn!(
                document_id = %doc.id(),
                status = %doc.status(),
                "Committed deletion removed a non-draft document"
            );
        }
    }

    /// Draws the next free number on a copy of the sequence.
    ///
    /// Numbers already carried by a stored document are skipped (and
    /// consumed), so a counter that fell behind its documents can never
    /// issue a duplicate.
    pub fn allocate_number(&self) -> LedgerResult<(InvoiceNumber, InvoiceSequence)> {
        let mut sequence = self.sequence.clone();
        loop {
            let number = sequence.allocate()?;
            if !self.documents.contains_invoice_number(&number) {
                return Ok((number, sequence));
            }
            warn!(invoice_number = %number, "Skipping invoice number already in use");
        }
    }

    /// The drawer a cash movement by `cashier_id` lands in.
    pub fn drawer_for(&self, cashier_id: &str) -> LedgerResult<&CashSession> {
        self.sessions
            .current_open(Some(cashier_id))
            .ok_or_else(|| LedgerError::NoOpenSession {
                cashier_id: match self.sessions.policy() {
                    DrawerPolicy::PerCashier => Some(cashier_id.to_string()),
                    DrawerPolicy::Shared => None,
                },
            })
    }

    /// Plans a signed cash movement. Zero amounts need no drawer.
    pub fn plan_cash(&self, cashier_id: &str, amount: Money) -> LedgerResult<Option<CashSession>> {
        if amount.is_zero() {
            return Ok(None);
        }
        self.drawer_for(cashier_id)?.with_movement(amount).map(Some)
    }

    /// Plans the drawer side of a corrected cash sale.
    pub fn plan_sale_correction(
        &self,
        cashier_id: &str,
        delta: Money,
    ) -> LedgerResult<Option<CashSession>> {
        if delta.is_zero() {
            return Ok(None);
        }
        self.drawer_for(cashier_id)?
            .with_sale_correction(delta)
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use till_core::{DocumentBody, DocumentId, PaymentMethod, SaleDocument, SaleItem};

    fn invoice(id: &str, number: &str) -> SaleDocument {
        let mut body = DocumentBody::new("c1");
        body.items.push(SaleItem {
            product_id: "p1".into(),
            name: "Tea".into(),
            unit_price: Money::from_cents(100),
            quantity: 1,
        });
        SaleDocument::new_invoice(
            DocumentId::from(id),
            body,
            InvoiceNumber::from(number),
            PaymentMethod::Card,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_restore_reseeds_forward_only() {
        let mut config = LedgerConfig::default();
        config.sequence.invoice_prefix = "FAC-".into();
        config.sequence.next_invoice_number = 3;

        let snapshot = LedgerSnapshot {
            sequence: Some(InvoiceSequence::new("INV-", 10, 4)),
            ..LedgerSnapshot::default()
        };
        let state = LedgerState::restore(snapshot, &config);
        assert_eq!(state.sequence.peek().unwrap().as_str(), "FAC-0010");

        config.sequence.next_invoice_number = 50;
        let snapshot = LedgerSnapshot {
            sequence: Some(InvoiceSequence::new("INV-", 10, 4)),
            ..LedgerSnapshot::default()
        };
        let state = LedgerState::restore(snapshot, &config);
        assert_eq!(state.sequence.next_value(), 50);
    }

    #[test]
    fn test_allocation_skips_numbers_in_use() {
        let snapshot = LedgerSnapshot {
            documents: vec![invoice("d1", "INV-0001"), invoice("d2", "INV-0002")],
            ..LedgerSnapshot::default()
        };
        let state = LedgerState::restore(snapshot, &LedgerConfig::default());

        let (number, sequence) = state.allocate_number().unwrap();
        assert_eq!(number.as_str(), "INV-0003");
        assert_eq!(sequence.next_value(), 4);
        // Planning never moves the live counter.
        assert_eq!(state.sequence.next_value(), 1);
    }

    #[test]
    fn test_cash_routing_without_drawer() {
        let state = LedgerState::restore(LedgerSnapshot::default(), &LedgerConfig::default());

        assert_eq!(state.plan_cash("c1", Money::zero()), Ok(None));
        assert_eq!(
            state.plan_cash("c1", Money::from_cents(100)),
            Err(LedgerError::NoOpenSession { cashier_id: None })
        );
    }
}
