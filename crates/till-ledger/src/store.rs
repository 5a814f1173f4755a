//! # Durable Store Seam
//!
//! What the engine needs from persistence: load everything once at startup,
//! then commit change sets atomically.
//!
//! [`Database`] is the production implementation. Tests wrap it to inject
//! failures.

use async_trait::async_trait;
use std::sync::Arc;

use till_core::LedgerCommit;
use till_db::{Database, DbResult, LedgerSnapshot};

#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Reads documents, sessions and the allocator state.
    async fn load(&self) -> DbResult<LedgerSnapshot>;

    /// Makes a change set durable. Either all of it lands or none of it.
    async fn commit(&self, commit: &LedgerCommit) -> DbResult<()>;
}

#[async_trait]
impl LedgerStore for Database {
    async fn load(&self) -> DbResult<LedgerSnapshot> {
        self.load_snapshot().await
    }

    async fn commit(&self, commit: &LedgerCommit) -> DbResult<()> {
        Database::commit(self, commit).await
    }
}

#[async_trait]
impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    async fn load(&self) -> DbResult<LedgerSnapshot> {
        (**self).load().await
    }

    async fn commit(&self, commit: &LedgerCommit) -> DbResult<()> {
        (**self).commit(commit).await
    }
}
