//! # Cash Session Repository
//!
//! Durable storage of drawer sessions. A session row is rewritten whole on
//! every movement; closed rows are never written again by the ledger.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{CashSession, Money, SessionId, SessionStatus};

#[derive(Debug, FromRow)]
struct SessionRow {
    id: String,
    cashier_id: String,
    cashier_name: String,
    opened_at: DateTime<Utc>,
    opening_balance: i64,
    expected_balance: i64,
    total_cash_sales: i64,
    total_cash_refunds: i64,
    status: SessionStatus,
    closing_balance: Option<i64>,
    closed_at: Option<DateTime<Utc>>,
}

impl From<SessionRow> for CashSession {
    fn from(row: SessionRow) -> Self {
        CashSession {
            id: SessionId::from(row.id),
            cashier_id: row.cashier_id,
            cashier_name: row.cashier_name,
            opened_at: row.opened_at,
            opening_balance: Money::from_cents(row.opening_balance),
            expected_balance: Money::from_cents(row.expected_balance),
            total_cash_sales: Money::from_cents(row.total_cash_sales),
            total_cash_refunds: Money::from_cents(row.total_cash_refunds),
            status: row.status,
            closing_balance: row.closing_balance.map(Money::from_cents),
            closed_at: row.closed_at,
        }
    }
}

const SELECT_SESSIONS: &str = r#"
    SELECT
        id, cashier_id, cashier_name, opened_at,
        opening_balance, expected_balance, total_cash_sales, total_cash_refunds,
        status, closing_balance, closed_at
    FROM cash_sessions
"#;

/// Repository for cash session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// All sessions, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<CashSession>> {
        let rows: Vec<SessionRow> =
            sqlx::query_as(&format!("{SELECT_SESSIONS} ORDER BY opened_at, id"))
                .fetch_all(&self.pool)
                .await?;

        debug!(sessions = rows.len(), "Loaded cash sessions");
        Ok(rows.into_iter().map(CashSession::from).collect())
    }
}

/// Writes a session on an open connection.
pub(crate) async fn upsert_in(conn: &mut SqliteConnection, session: &CashSession) -> DbResult<()> {
    debug!(
        id = %session.id,
        status = ?session.status,
        expected = session.expected_balance.cents(),
        "Upserting cash session"
    );

    sqlx::query(
        r#"
        INSERT INTO cash_sessions (
            id, cashier_id, cashier_name, opened_at,
            opening_balance, expected_balance, total_cash_sales, total_cash_refunds,
            status, closing_balance, closed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT (id) DO UPDATE SET
            expected_balance   = excluded.expected_balance,
            total_cash_sales   = excluded.total_cash_sales,
            total_cash_refunds = excluded.total_cash_refunds,
            status             = excluded.status,
            closing_balance    = excluded.closing_balance,
            closed_at          = excluded.closed_at
        "#,
    )
    .bind(session.id.as_str())
    .bind(&session.cashier_id)
    .bind(&session.cashier_name)
    .bind(session.opened_at)
    .bind(session.opening_balance.cents())
    .bind(session.expected_balance.cents())
    .bind(session.total_cash_sales.cents())
    .bind(session.total_cash_refunds.cents())
    .bind(session.status)
    .bind(session.closing_balance.map(|m| m.cents()))
    .bind(session.closed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
