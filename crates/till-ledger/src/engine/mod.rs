//! # Ledger Engine
//!
//! The single authority over sale documents, invoice numbers and cash
//! drawers.
//!
//! ## Document Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   save_draft ──► DRAFT ────── confirm_draft ──────┐                     │
//! │                    │                              ▼                     │
//! │                 discard                      CONFIRMED ──► refund ──►   │
//! │                    ▼                          (INV-0001)     REFUNDED   │
//! │                 (gone)                            ▲         (INV-0001)  │
//! │                                                   │                     │
//! │   save_quotation ──► QUOTATION ── convert_to_invoice                    │
//! │                                                                         │
//! │   confirm(candidate) picks the edge from the stored state of its id:    │
//! │     unknown id → new invoice       draft/quotation → post               │
//! │     confirmed  → correction        refunded        → InvalidTransition  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  writer.lock().await            one write at a time                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan(&state, now)              validate, draw a number on a copy of    │
//! │       │                         the sequence, build a LedgerCommit      │
//! │       ▼                                                                 │
//! │  store.commit(&commit).await    one SQLite transaction                  │
//! │       │            │                                                    │
//! │       │ ok         └── error ──► return Err, memory untouched           │
//! │       ▼                                                                 │
//! │  state.write().apply(commit)    readers see all of it or none of it     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  events.publish(...)                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads (`get`, `list_documents`, session lookups) take the state lock
//! only long enough to clone what they return, so they never wait on a
//! durable write.

mod listing;


pub use listing::DocumentListing;

use chrono::{NaiveDate, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use till_core::{
    CandidateDocument, CashSession, DocumentBody, DocumentFilter, DocumentId, DrawerPolicy,
    InvoiceNumber, InvoiceSequence, LedgerCommit, LedgerError, LedgerResult, Money,
    PaymentMethod, SaleDocument, SaleItem, SessionClosure, SessionId, Timestamp,
};
use till_db::{Database, DbConfig};

use crate::config::LedgerConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{EventBus, LedgerEvent};
use crate::report::{self, Reservation, RevenueSummary};
use crate::state::LedgerState;
use crate::store::LedgerStore;

// =============================================================================
// Staged Change
// =============================================================================

/// A planned write: what to persist, what to announce, what to return.
struct Staged<T> {
    commit: LedgerCommit,
    events: Vec<LedgerEvent>,
    output: T,
}

impl<T> Staged<T> {
    fn new(commit: LedgerCommit, output: T) -> Self {
        Staged {
            commit,
            events: Vec::new(),
            output,
        }
    }

    /// Nothing to write, e.g. a retried confirmation.
    fn unchanged(output: T) -> Self {
        Staged::new(LedgerCommit::new(), output)
    }

    fn event(mut self, event: LedgerEvent) -> Self {
        self.events.push(event);
        self
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Ledger engine over a durable store.
///
/// Share it between tasks with an `Arc`; every method takes `&self`.
pub struct LedgerEngine<S = Database> {
    store: S,
    writer: Mutex<()>,
    state: RwLock<LedgerState>,
    events: EventBus,
}

impl LedgerEngine<Database> {
    /// Opens (or creates) the SQLite ledger described by `config`.
    pub async fn open(config: &LedgerConfig) -> EngineResult<Self> {
        let db_config = DbConfig::new(config.database_path())
            .max_connections(config.database.max_connections);
        let db = Database::new(db_config).await?;
        Self::start(db, config).await
    }
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Loads the ledger from `store` and applies configured sequence values.
    ///
    /// The reseeded sequence is written back before the engine accepts any
    /// operation.
    pub async fn start(store: S, config: &LedgerConfig) -> EngineResult<Self> {
        config.validate()?;

        let snapshot = store.load().await?;
        let state = LedgerState::restore(snapshot, config);

        store
            .commit(&LedgerCommit::new().with_sequence(state.sequence.clone()))
            .await?;

        info!(
            documents = state.documents.len(),
            sessions = state.sessions.list().count(),
            prefix = state.sequence.prefix(),
            next_invoice = state.sequence.next_value(),
            policy = ?state.sessions.policy(),
            "Ledger engine started"
        );

        Ok(LedgerEngine {
            store,
            writer: Mutex::new(()),
            state: RwLock::new(state),
            events: EventBus::new(config.events.capacity),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Stores a new draft, or revises a draft with the same id.
    pub async fn save_draft(&self, candidate: CandidateDocument) -> EngineResult<SaleDocument> {
        let CandidateDocument { id, body } = candidate;
        self.execute("save_draft", move |state, now| {
            let id = id.unwrap_or_else(DocumentId::generate);
            match state.documents.find(&id) {
                None => plan_saved(None, SaleDocument::new_draft(id, body, None, now)?),
                Some(existing @ SaleDocument::Draft(_)) => {
                    plan_saved(Some(existing), existing.revise(body, None)?)
                }
                Some(existing) => Err(reject(existing, "save as draft")),
            }
        })
        .await
    }

    /// Stores a new quotation, or revises a quotation with the same id.
    ///
    /// Quotations need a named customer. No invoice number is reserved.
    pub async fn save_quotation(
        &self,
        candidate: CandidateDocument,
    ) -> EngineResult<SaleDocument> {
        let CandidateDocument { id, body } = candidate;
        self.execute("save_quotation", move |state, now| {
            let id = id.unwrap_or_else(DocumentId::generate);
            match state.documents.find(&id) {
                None => plan_saved(None, SaleDocument::new_quotation(id, body, None, now)?),
                Some(existing @ SaleDocument::Quotation(_)) => {
                    plan_saved(Some(existing), existing.revise(body, None)?)
                }
                Some(existing) => Err(reject(existing, "save as quotation")),
            }
        })
        .await
    }

    /// Confirms a candidate with payment.
    ///
    /// The stored state of the candidate's id decides what happens:
    ///
    /// | Stored            | Result                                         |
    /// |-------------------|------------------------------------------------|
    /// | nothing           | new invoice with a fresh number                |
    /// | draft / quotation | posted with the candidate's content            |
    /// | confirmed         | corrected in place, number kept; a retry with  |
    /// |                   | unchanged content writes nothing               |
    /// | refunded          | `InvalidTransition`                            |
    pub async fn confirm(
        &self,
        candidate: CandidateDocument,
        payment: PaymentMethod,
    ) -> EngineResult<SaleDocument> {
        let CandidateDocument { id, body } = candidate;
        self.execute("confirm", move |state, now| {
            let id = id.unwrap_or_else(DocumentId::generate);
            let Some(existing) = state.documents.find(&id) else {
                return plan_new_invoice(state, id, body, payment, now);
            };

            match existing {
                SaleDocument::Draft(_) | SaleDocument::Quotation(_) => {
                    let revised = existing.revise(body, Some(payment))?;
                    plan_post(state, &revised, payment, now)
                }
                SaleDocument::Confirmed(_) => plan_correction(state, existing, body, Some(payment)),
                SaleDocument::Refunded(_) => Err(reject(existing, "confirm")),
            }
        })
        .await
    }

    /// Posts a stored draft as it stands.
    ///
    /// A draft that was already confirmed (a retried call) is returned
    /// unchanged.
    pub async fn confirm_draft(
        &self,
        id: &DocumentId,
        payment: PaymentMethod,
    ) -> EngineResult<SaleDocument> {
        self.execute("confirm_draft", |state, now| {
            let existing = state.documents.get(id)?;
            match existing {
                SaleDocument::Draft(_) => plan_post(state, existing, payment, now),
                SaleDocument::Confirmed(_) => Ok(Staged::unchanged(existing.clone())),
                _ => Err(reject(existing, "confirm draft")),
            }
        })
        .await
    }

    /// Converts a stored quotation into an invoice.
    ///
    /// The number is drawn now and the issue date is the conversion time.
    pub async fn convert_to_invoice(
        &self,
        id: &DocumentId,
        payment: PaymentMethod,
    ) -> EngineResult<SaleDocument> {
        self.execute("convert_to_invoice", |state, now| {
            let existing = state.documents.get(id)?;
            match existing {
                SaleDocument::Quotation(_) => plan_post(state, existing, payment, now),
                SaleDocument::Confirmed(_) => Ok(Staged::unchanged(existing.clone())),
                _ => Err(reject(existing, "convert")),
            }
        })
        .await
    }

    /// Replaces a document's content in place.
    ///
    /// Drafts and quotations change freely. A confirmed invoice is
    /// corrected: number, status and issue date stay. Refunded documents
    /// are refused.
    pub async fn edit(
        &self,
        id: &DocumentId,
        body: DocumentBody,
        payment: Option<PaymentMethod>,
    ) -> EngineResult<SaleDocument> {
        self.execute("edit", move |state, _| {
            let existing = state.documents.get(id)?;
            plan_edit(state, existing, body, payment)
        })
        .await
    }

    /// Adds a line, merging quantities when the product is already there.
    pub async fn add_item(&self, id: &DocumentId, item: SaleItem) -> EngineResult<SaleDocument> {
        self.execute("add_item", move |state, _| {
            let existing = state.documents.get(id)?;
            let mut body = existing.body().clone();
            body.add_item(item)?;
            plan_edit(state, existing, body, None)
        })
        .await
    }

    /// Deletes a draft. Every other status is refused.
    pub async fn discard(&self, id: &DocumentId) -> EngineResult<SaleDocument> {
        self.execute("discard", |state, _| {
            let existing = state.documents.get(id)?;
            existing.ensure_discardable()?;

            let staged = Staged::new(
                LedgerCommit::new().delete_document(id.clone()),
                existing.clone(),
            );
            Ok(staged.event(LedgerEvent::DraftDiscarded {
                document_id: id.clone(),
            }))
        })
        .await
    }

    /// Reverses a confirmed invoice, keeping its number and total.
    ///
    /// Cash refunds leave the drawer `refunded_by` works from.
    pub async fn refund(&self, id: &DocumentId, refunded_by: &str) -> EngineResult<SaleDocument> {
        self.execute("refund", |state, now| {
            let existing = state.documents.get(id)?;
            let refunded = existing.refund(refunded_by, now)?;

            let mut commit = LedgerCommit::new().upsert_document(refunded.clone());
            if let Some(session) = state.plan_cash(refunded_by, -existing.cash_impact())? {
                commit = commit.upsert_session(session);
            }

            Ok(Staged::new(commit, refunded.clone())
                .event(LedgerEvent::DocumentRefunded { document: refunded }))
        })
        .await
    }

    // =========================================================================
    // Cash Sessions
    // =========================================================================

    /// Opens a drawer, if the drawer policy allows another one.
    pub async fn open_session(
        &self,
        cashier_id: &str,
        cashier_name: &str,
        opening_balance: Money,
    ) -> EngineResult<CashSession> {
        self.execute("open_session", |state, now| {
            let session = state
                .sessions
                .plan_open(cashier_id, cashier_name, opening_balance, now)?;

            Ok(
                Staged::new(LedgerCommit::new().upsert_session(session.clone()), session.clone())
                    .event(LedgerEvent::SessionOpened { session }),
            )
        })
        .await
    }

    /// Closes a drawer with the declared count and returns the variance.
    pub async fn close_session(
        &self,
        id: &SessionId,
        declared_balance: Money,
    ) -> EngineResult<SessionClosure> {
        self.execute("close_session", |state, now| {
            let closure = state.sessions.plan_close(id, declared_balance, now)?;

            let commit = LedgerCommit::new().upsert_session(closure.session.clone());
            let event = LedgerEvent::SessionClosed {
                session: closure.session.clone(),
                variance: closure.variance,
            };
            Ok(Staged::new(commit, closure).event(event))
        })
        .await
    }

    /// The open drawer a cashier's cash lands in.
    ///
    /// With a shared drawer the cashier is ignored.
    pub fn current_open_session(&self, cashier_id: Option<&str>) -> Option<CashSession> {
        self.read().sessions.current_open(cashier_id).cloned()
    }

    pub fn session(&self, id: &SessionId) -> EngineResult<CashSession> {
        self.read()
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::SessionNotFound(id.to_string()).into())
    }

    /// Drawer history, newest first.
    pub fn sessions(&self) -> Vec<CashSession> {
        self.read().sessions.list().cloned().collect()
    }

    pub fn drawer_policy(&self) -> DrawerPolicy {
        self.read().sessions.policy()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get(&self, id: &DocumentId) -> EngineResult<SaleDocument> {
        let doc = self.read().documents.get(id)?.clone();
        debug!(document_id = %id, status = %doc.status(), "Document loaded");
        Ok(doc)
    }

    /// Snapshot listing of documents matching `filter`.
    pub fn list_documents(&self, filter: DocumentFilter) -> DocumentListing {
        DocumentListing::new(Arc::clone(&self.read().documents), filter)
    }

    pub fn revenue_summary(&self, filter: &DocumentFilter) -> RevenueSummary {
        RevenueSummary::from_documents(self.read().documents.list(filter))
    }

    /// Event reservations dated `from..=to`, earliest first.
    pub fn reservations(&self, from: NaiveDate, to: NaiveDate) -> Vec<Reservation> {
        report::reservations(self.read().documents.iter(), from, to)
    }

    /// The number the next confirmation would receive.
    pub fn next_invoice_number(&self) -> EngineResult<InvoiceNumber> {
        Ok(self.read().sequence.peek()?)
    }

    pub fn sequence(&self) -> InvoiceSequence {
        self.read().sequence.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    async fn execute<T>(
        &self,
        operation: &'static str,
        plan: impl FnOnce(&LedgerState, Timestamp) -> LedgerResult<Staged<T>>,
    ) -> EngineResult<T> {
        let _writer = self.writer.lock().await;

        let planned = {
            let state = self.read();
            plan(&state, Utc::now())
        };
        let staged = planned.map_err(|e| {
            warn!(operation, error = %e, "Ledger operation refused");
            EngineError::from(e)
        })?;

        if staged.commit.is_empty() {
            debug!(operation, "Nothing to commit");
            return Ok(staged.output);
        }

        if let Err(e) = self.store.commit(&staged.commit).await {
            error!(operation, error = %e, "Durable commit failed, ledger unchanged");
            return Err(e.into());
        }

        self.write().apply(staged.commit);

        for event in &staged.events {
            log_committed(event);
        }
        self.events.publish_all(staged.events);

        Ok(staged.output)
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().expect("ledger state poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().expect("ledger state poisoned")
    }
}

// =============================================================================
// Planning
// =============================================================================

fn reject(doc: &SaleDocument, operation: &'static str) -> LedgerError {
    LedgerError::invalid_transition(doc.id().as_str(), doc.status(), operation)
}

/// Stores a draft or quotation unless it is identical to what is stored.
fn plan_saved(
    existing: Option<&SaleDocument>,
    doc: SaleDocument,
) -> LedgerResult<Staged<SaleDocument>> {
    if existing == Some(&doc) {
        return Ok(Staged::unchanged(doc));
    }
    Ok(
        Staged::new(LedgerCommit::new().upsert_document(doc.clone()), doc.clone())
            .event(LedgerEvent::DocumentSaved { document: doc }),
    )
}

fn plan_edit(
    state: &LedgerState,
    existing: &SaleDocument,
    body: DocumentBody,
    payment: Option<PaymentMethod>,
) -> LedgerResult<Staged<SaleDocument>> {
    match existing {
        SaleDocument::Confirmed(_) => plan_correction(state, existing, body, payment),
        _ => plan_saved(Some(existing), existing.revise(body, payment)?),
    }
}

fn plan_new_invoice(
    state: &LedgerState,
    id: DocumentId,
    body: DocumentBody,
    payment: PaymentMethod,
    now: Timestamp,
) -> LedgerResult<Staged<SaleDocument>> {
    body.validate_for_posting()?;
    let (number, sequence) = state.allocate_number()?;
    let doc = SaleDocument::new_invoice(id, body, number, payment, now)?;
    plan_posted(state, doc, sequence)
}

fn plan_post(
    state: &LedgerState,
    ticket: &SaleDocument,
    payment: PaymentMethod,
    now: Timestamp,
) -> LedgerResult<Staged<SaleDocument>> {
    ticket.check_postable()?;
    let (number, sequence) = state.allocate_number()?;
    let doc = ticket.post(number, payment, now)?;
    plan_posted(state, doc, sequence)
}

fn plan_posted(
    state: &LedgerState,
    doc: SaleDocument,
    sequence: InvoiceSequence,
) -> LedgerResult<Staged<SaleDocument>> {
    let mut commit = LedgerCommit::new()
        .upsert_document(doc.clone())
        .with_sequence(sequence);
    if let Some(session) = state.plan_cash(&doc.body().cashier_id, doc.cash_impact())? {
        commit = commit.upsert_session(session);
    }

    Ok(Staged::new(commit, doc.clone()).event(LedgerEvent::DocumentConfirmed { document: doc }))
}

/// Corrects a posted invoice and moves the drawer by the change in cash.
fn plan_correction(
    state: &LedgerState,
    existing: &SaleDocument,
    body: DocumentBody,
    payment: Option<PaymentMethod>,
) -> LedgerResult<Staged<SaleDocument>> {
    let corrected = existing.correct(body, payment)?;
    if &corrected == existing {
        return Ok(Staged::unchanged(corrected));
    }

    let mut commit = LedgerCommit::new().upsert_document(corrected.clone());
    let delta = corrected.cash_impact() - existing.cash_impact();
    if let Some(session) = state.plan_sale_correction(&corrected.body().cashier_id, delta)? {
        commit = commit.upsert_session(session);
    }

    Ok(Staged::new(commit, corrected.clone())
        .event(LedgerEvent::DocumentCorrected { document: corrected }))
}

fn log_committed(event: &LedgerEvent) {
    match event {
        LedgerEvent::DocumentSaved { document } => info!(
            document_id = %document.id(),
            status = %document.status(),
            total = %document.total(),
            "Document saved"
        ),
        LedgerEvent::DocumentConfirmed { document } => info!(
            document_id = %document.id(),
            invoice_number = document.invoice_number().map(InvoiceNumber::as_str),
            total = %document.total(),
            payment = ?document.payment_method(),
            "Invoice confirmed"
        ),
        LedgerEvent::DocumentCorrected { document } => info!(
            document_id = %document.id(),
            invoice_number = document.invoice_number().map(InvoiceNumber::as_str),
            total = %document.total(),
            "Invoice corrected"
        ),
        LedgerEvent::DocumentRefunded { document } => info!(
            document_id = %document.id(),
            invoice_number = document.invoice_number().map(InvoiceNumber::as_str),
            amount = %document.total(),
            "Invoice refunded"
        ),
        LedgerEvent::DraftDiscarded { document_id } => {
            info!(document_id = %document_id, "Draft discarded")
        }
        LedgerEvent::SessionOpened { session } => info!(
            session_id = %session.id,
            cashier_id = %session.cashier_id,
            amount = %session.opening_balance,
            "Cash session opened"
        ),
        LedgerEvent::SessionClosed { session, variance } => info!(
            session_id = %session.id,
            expected = %session.expected_balance,
            variance = %variance,
            "Cash session closed"
        ),
    }
}
