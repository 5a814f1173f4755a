//! # Database Pool Management
//!
//! Connection pool creation, ledger snapshots and transactional commits.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Ledger startup                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ├── load_snapshot()  ← documents, sessions, sequence             │
//! │       │                                                                 │
//! │       └── commit(&LedgerCommit)                                        │
//! │              BEGIN                                                      │
//! │                delete drafts                                            │
//! │                upsert documents + lines                                 │
//! │                upsert sessions                                          │
//! │                save sequence                                            │
//! │              COMMIT   (or nothing at all)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases run in WAL mode so snapshot reads never wait for the
//! ledger's single writer.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::document::{self, DocumentRepository};
use crate::repository::sequence::{self, SequenceRepository};
use crate::repository::session::{self, SessionRepository};
use till_core::{CashSession, InvoiceSequence, LedgerCommit, SaleDocument};

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/ledger.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file. Ignored for in-memory databases.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    in_memory: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
            in_memory: false,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// A single connection that never idles out, since the database lives
    /// and dies with that connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            run_migrations: true,
            in_memory: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            // NORMAL synchronous: durable at every commit in WAL mode
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true))
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything the ledger needs to rebuild its in-memory state.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    /// Documents in insertion order.
    pub documents: Vec<SaleDocument>,
    /// Sessions, oldest first.
    pub sessions: Vec<CashSession>,
    /// `None` on a database that never allocated a number.
    pub sequence: Option<InvoiceSequence>,
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Creates the pool and runs migrations (if enabled).
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite: WAL, NORMAL synchronous, foreign keys on
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            in_memory = config.in_memory,
            "Initializing database connection"
        );

        let connect_options = config.connect_options()?;
        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(if config.in_memory {
                None
            } else {
                Some(Duration::from_secs(30 * 60))
            })
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    pub fn sessions(&self) -> SessionRepository {
        SessionRepository::new(self.pool.clone())
    }

    pub fn sequence(&self) -> SequenceRepository {
        SequenceRepository::new(self.pool.clone())
    }

    /// Loads documents, sessions and the allocator state.
    pub async fn load_snapshot(&self) -> DbResult<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            documents: self.documents().list_all().await?,
            sessions: self.sessions().list_all().await?,
            sequence: self.sequence().load().await?,
        };

        info!(
            documents = snapshot.documents.len(),
            sessions = snapshot.sessions.len(),
            next_invoice = snapshot.sequence.as_ref().map(InvoiceSequence::next_value),
            "Ledger snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Applies a change set atomically: every write lands, or none does.
    pub async fn commit(&self, commit: &LedgerCommit) -> DbResult<()> {
        if commit.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for id in &commit.deleted {
            document::delete_in(&mut *tx, id).await?;
        }
        for doc in &commit.documents {
            document::upsert_in(&mut *tx, doc).await?;
        }
        for s in &commit.sessions {
            session::upsert_in(&mut *tx, s).await?;
        }
        if let Some(seq) = &commit.sequence {
            sequence::save_in(&mut *tx, seq).await?;
        }

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Ledger commit failed");
            DbError::TransactionFailed(e.to_string())
        })?;

        debug!(
            documents = commit.documents.len(),
            deleted = commit.deleted.len(),
            sessions = commit.sessions.len(),
            sequence = commit.sequence.is_some(),
            "Ledger commit durable"
        );
        Ok(())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use till_core::{
        DocumentBody, DocumentId, DrawerPolicy, CashSessionLedger, EventReservation,
        InvoiceNumber, Money, PaymentMethod, SaleItem, SessionStatus,
    };

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn body(items: &[(&str, i64, i64)]) -> DocumentBody {
        DocumentBody {
            customer: "Awa".to_string(),
            items: items
                .iter()
                .map(|(id, cents, qty)| SaleItem {
                    product_id: id.to_string(),
                    name: id.to_uppercase(),
                    unit_price: Money::from_cents(*cents),
                    quantity: *qty,
                })
                .collect(),
            location: Some("Terrace 4".to_string()),
            ..DocumentBody::new("c1")
        }
    }

    fn invoice(id: &str, number: &str) -> SaleDocument {
        SaleDocument::new_invoice(
            DocumentId::from(id),
            body(&[("b", 100, 1), ("a", 150, 2)]),
            InvoiceNumber::from(number),
            PaymentMethod::Cash,
            Utc.with_ymd_and_hms(2026, 4, 1, 12, 30, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = db().await;
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/ledger.db")
            .max_connections(10)
            .min_connections(2);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.is_in_memory());
    }

    #[tokio::test]
    async fn test_commit_and_reload_documents() {
        let db = db().await;
        let confirmed = invoice("d1", "INV-0001");
        let refunded = invoice("d2", "INV-0002")
            .refund("manager", Utc::now())
            .unwrap();
        let mut quotation_body = body(&[]);
        quotation_body.event = Some(EventReservation {
            event_date: NaiveDate::from_ymd_opt(2026, 6, 20).unwrap(),
            event_type: "Wedding".to_string(),
            guest_count: 80,
            venue: Some("Main hall".to_string()),
        });
        let quotation = SaleDocument::new_quotation(
            DocumentId::from("q1"),
            quotation_body,
            None,
            Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap(),
        )
        .unwrap();

        let mut seq = InvoiceSequence::new("INV-", 1, 4);
        seq.allocate().unwrap();
        seq.allocate().unwrap();

        let commit = LedgerCommit::new()
            .upsert_document(confirmed.clone())
            .upsert_document(refunded.clone())
            .upsert_document(quotation.clone())
            .with_sequence(seq.clone());
        db.commit(&commit).await.unwrap();

        let snapshot = db.load_snapshot().await.unwrap();
        assert_eq!(snapshot.documents, vec![confirmed, refunded, quotation]);
        assert_eq!(snapshot.sequence, Some(seq));

        // Line order and derived total survive the round trip.
        let reloaded = &snapshot.documents[0];
        assert_eq!(reloaded.body().items[0].product_id, "b");
        assert_eq!(reloaded.total().cents(), 400);
        assert_eq!(reloaded.invoice_number().unwrap().as_str(), "INV-0001");
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_rolls_back_whole_commit() {
        let db = db().await;
        db.commit(&LedgerCommit::new().upsert_document(invoice("d1", "INV-0001")))
            .await
            .unwrap();

        let session = CashSessionLedger::new(DrawerPolicy::Shared)
            .plan_open("c1", "Fatou", Money::from_cents(500), Utc::now())
            .unwrap();
        let clash = LedgerCommit::new()
            .upsert_session(session)
            .upsert_document(invoice("d2", "INV-0001"))
            .with_sequence(InvoiceSequence::new("INV-", 9, 4));

        let err = db.commit(&clash).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let snapshot = db.load_snapshot().await.unwrap();
        assert_eq!(snapshot.documents.len(), 1);
        assert!(snapshot.sessions.is_empty());
        assert!(snapshot.sequence.is_none());
    }

    #[tokio::test]
    async fn test_session_round_trip_and_delete_cascade() {
        let db = db().await;
        let mut ledger = CashSessionLedger::new(DrawerPolicy::Shared);
        let opened = ledger.open("c1", "Fatou", Money::from_cents(5000)).unwrap();
        let moved = ledger
            .record_cash_movement(&opened.id, Money::from_cents(1200))
            .unwrap();
        let closure = ledger.close(&opened.id, Money::from_cents(6150)).unwrap();

        db.commit(&LedgerCommit::new().upsert_session(moved))
            .await
            .unwrap();
        let open = db.sessions().list_all().await.unwrap();
        assert_eq!(open.len(), 1);
        assert!(open[0].is_open());

        db.commit(&LedgerCommit::new().upsert_session(closure.session.clone()))
            .await
            .unwrap();
        let mut sessions = db.sessions().list_all().await.unwrap();
        assert_eq!(sessions.len(), 1);
        let stored = sessions.remove(0);
        assert_eq!(stored.id, opened.id);
        assert_eq!(stored, closure.session);
        assert_eq!(stored.status, SessionStatus::Closed);
        assert_eq!(stored.variance(), Some(Money::from_cents(-50)));

        let draft = SaleDocument::new_draft(
            DocumentId::from("t1"),
            body(&[("a", 100, 1)]),
            None,
            Utc::now(),
        )
        .unwrap();
        db.commit(&LedgerCommit::new().upsert_document(draft))
            .await
            .unwrap();
        db.commit(&LedgerCommit::new().delete_document(DocumentId::from("t1")))
            .await
            .unwrap();

        assert!(db.documents().list_all().await.unwrap().is_empty());
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_document_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_schema_refuses_unposted_row_with_number() {
        let db = db().await;
        let result = sqlx::query(
            "INSERT INTO sale_documents (id, status, invoice_number, customer, cashier_id, created_at)
             VALUES ('x', 'draft', 'INV-0001', 'Awa', 'c1', '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await;

        assert!(matches!(
            result.map_err(DbError::from),
            Err(DbError::CheckViolation { .. })
        ));
    }
}
