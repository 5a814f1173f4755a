//! Restartable document listings over a point-in-time snapshot.

use std::sync::Arc;

use till_core::{DocumentFilter, DocumentStore, SaleDocument};

use crate::report::RevenueSummary;

/// Documents matching a filter, as they stood when the listing was taken.
///
/// Commits made after that moment are not visible here. Each call to
/// [`DocumentListing::iter`] starts a fresh lazy pass.
#[derive(Debug, Clone)]
pub struct DocumentListing {
    snapshot: Arc<DocumentStore>,
    filter: DocumentFilter,
}

impl DocumentListing {
    pub(crate) fn new(snapshot: Arc<DocumentStore>, filter: DocumentFilter) -> Self {
        DocumentListing { snapshot, filter }
    }

    pub fn filter(&self) -> &DocumentFilter {
        &self.filter
    }

    /// Matching documents in the order they were first stored.
    pub fn iter(&self) -> impl Iterator<Item = &SaleDocument> + '_ {
        self.snapshot.list(&self.filter)
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Sales journal order: newest issue (or creation) time first.
    pub fn newest_first(&self) -> Vec<&SaleDocument> {
        let mut docs: Vec<&SaleDocument> = self.iter().collect();
        // Later insertions win ties.
        docs.reverse();
        docs.sort_by(|a, b| b.reference_time().cmp(&a.reference_time()));
        docs
    }

    pub fn summary(&self) -> RevenueSummary {
        RevenueSummary::from_documents(self.iter())
    }
}
