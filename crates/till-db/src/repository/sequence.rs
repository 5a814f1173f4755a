//! # Invoice Sequence Repository
//!
//! Single-row storage for the allocator state. The row is written in the
//! same transaction as the document that consumed the number.

use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::InvoiceSequence;

#[derive(Debug, FromRow)]
struct SequenceRow {
    prefix: String,
    next_value: i64,
    width: i64,
}

impl TryFrom<SequenceRow> for InvoiceSequence {
    type Error = DbError;

    fn try_from(row: SequenceRow) -> DbResult<Self> {
        let next = u64::try_from(row.next_value)
            .map_err(|_| DbError::corrupt("InvoiceSequence", "1", "negative counter"))?;
        let width = u32::try_from(row.width)
            .map_err(|_| DbError::corrupt("InvoiceSequence", "1", "invalid width"))?;
        Ok(InvoiceSequence::new(row.prefix, next, width))
    }
}

#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Stored allocator state, or `None` on a fresh database.
    pub async fn load(&self) -> DbResult<Option<InvoiceSequence>> {
        let row: Option<SequenceRow> =
            sqlx::query_as("SELECT prefix, next_value, width FROM invoice_sequence WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        row.map(InvoiceSequence::try_from).transpose()
    }

    /// Persists the allocator state in its own transaction.
    pub async fn save(&self, sequence: &InvoiceSequence) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        save_in(&mut *tx, sequence).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

/// Writes the allocator state on an open connection.
pub(crate) async fn save_in(conn: &mut SqliteConnection, sequence: &InvoiceSequence) -> DbResult<()> {
    let next = i64::try_from(sequence.next_value())
        .map_err(|_| DbError::Internal("invoice counter exceeds storage range".to_string()))?;

    debug!(
        prefix = sequence.prefix(),
        next,
        width = sequence.width(),
        "Saving invoice sequence"
    );

    sqlx::query(
        r#"
        INSERT INTO invoice_sequence (id, prefix, next_value, width)
        VALUES (1, ?1, ?2, ?3)
        ON CONFLICT (id) DO UPDATE SET
            prefix     = excluded.prefix,
            next_value = excluded.next_value,
            width      = excluded.width
        "#,
    )
    .bind(sequence.prefix())
    .bind(next)
    .bind(i64::from(sequence.width()))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
