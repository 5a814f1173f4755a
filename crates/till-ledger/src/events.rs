//! # Domain Events
//!
//! Fire-and-forget notifications published after every committed change.
//!
//! ## Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LedgerEngine::refund                                                   │
//! │       │  durable commit ok                                              │
//! │       ▼                                                                 │
//! │  EventBus::publish(DocumentRefunded)                                    │
//! │       │                                                                 │
//! │       ├──► notification subscriber                                      │
//! │       ├──► dashboard subscriber                                         │
//! │       └──► (nobody listening: dropped)                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are never published for a failed operation. A subscriber that
//! falls more than `capacity` events behind receives `RecvError::Lagged`
//! and skips ahead; the ledger itself never waits for anyone.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use ts_rs::TS;

use till_core::{CashSession, DocumentId, Money, SaleDocument};

/// Something that changed in the ledger, carrying the affected entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A draft or quotation was created or revised.
    DocumentSaved { document: SaleDocument },

    /// A document was posted with a fresh invoice number.
    DocumentConfirmed { document: SaleDocument },

    /// A posted invoice was corrected in place.
    DocumentCorrected { document: SaleDocument },

    DocumentRefunded { document: SaleDocument },

    DraftDiscarded { document_id: DocumentId },

    SessionOpened { session: CashSession },

    SessionClosed { session: CashSession, variance: Money },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::DocumentSaved { .. } => "document_saved",
            LedgerEvent::DocumentConfirmed { .. } => "document_confirmed",
            LedgerEvent::DocumentCorrected { .. } => "document_corrected",
            LedgerEvent::DocumentRefunded { .. } => "document_refunded",
            LedgerEvent::DraftDiscarded { .. } => "draft_discarded",
            LedgerEvent::SessionOpened { .. } => "session_opened",
            LedgerEvent::SessionClosed { .. } => "session_closed",
        }
    }
}

/// Broadcast channel for [`LedgerEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Sends to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: LedgerEvent) {
        let name = event.name();
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(event = name, delivered, "Ledger event published");
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = LedgerEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(256)
    }
}
