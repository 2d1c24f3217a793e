//! Book catalog with review-derived rating summaries.
//!
//! [`CatalogService`] is the single entry point. Its operations are split by
//! concern across submodules:
//!
//! - `reviews`: create/update/delete of a review, each ending in a mandatory
//!   recomputation of the book's summary
//! - `books`: book creation, detail edits, cascading deletion, reconciliation
//! - `queries`: reads, which never wait on a recomputation
//!
//! Every write that touches a book's derived fields runs inside that book's
//! scoped section ([`BookLocks`]), so the last summary written for a book is
//! always the one computed last.

pub mod books;
pub mod error;
pub mod locks;
pub mod models;
pub mod queries;
pub mod rating;
pub mod reviews;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;

use bookshelf_kernel::settings::{CatalogSettings, Settings, StorageEngine};

pub use error::{CatalogError, CatalogResult, FieldError};
pub use locks::{BookGuard, BookLocks};
pub use models::*;
pub use queries::{
    AdvancedSearchQuery, BookListQuery, BookWithReviews, SearchQuery, SortField, SortOrder,
    Suggestion, SuggestionKind, SuggestionQuery, Suggestions,
};
pub use rating::{summarize, RatingEngine};
pub use store::{CatalogStore, MemoryCatalogStore, SqliteCatalogStore};
pub use validation::PageRequest;

pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    locks: BookLocks,
    ratings: RatingEngine,
    paging: CatalogSettings,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, paging: CatalogSettings) -> Self {
        Self {
            ratings: RatingEngine::new(Arc::clone(&store)),
            store,
            locks: BookLocks::new(),
            paging,
        }
    }

    /// Service over a fresh in-process store with default paging, for tests.
    /// Nothing it holds outlives the process.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryCatalogStore::new()),
            CatalogSettings::default(),
        )
    }

    /// Service over the configured database, migrated and ready
    pub async fn open(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn CatalogStore> = match settings.database.engine {
            StorageEngine::Sqlite => Arc::new(
                SqliteCatalogStore::open(&settings.database)
                    .await
                    .with_context(|| format!("failed to open {}", settings.database.url))?,
            ),
        };
        tracing::info!(
            engine = ?settings.database.engine,
            url = %settings.database.url,
            "catalog store ready"
        );
        Ok(Self::new(store, settings.catalog.clone()))
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Number of books with an in-flight mutation
    pub fn books_in_flight(&self) -> usize {
        self.locks.active()
    }

    pub(crate) fn page_request(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> CatalogResult<PageRequest> {
        PageRequest::parse(
            page,
            limit,
            self.paging.default_page_size,
            self.paging.max_page_size,
        )
    }

    pub(crate) async fn require_book(&self, book_id: &BookId) -> CatalogResult<Book> {
        self.store
            .get_book(book_id)
            .await?
            .ok_or_else(|| CatalogError::book_not_found(book_id))
    }

    /// Final step of every review mutation: rebuild the guarded book's
    /// summary. The review write has already landed, so a failure here is
    /// reported as `Inconsistent` rather than as a plain storage error.
    pub(crate) async fn finish_mutation(
        &self,
        guard: &BookGuard,
        operation: &'static str,
    ) -> CatalogResult<RatingSummary> {
        match self.ratings.recompute(guard).await {
            Ok(summary) => Ok(summary.unwrap_or_default()),
            Err(err) => {
                tracing::error!(
                    alert = true,
                    book_id = %guard.book_id(),
                    operation,
                    error = %err,
                    "rating recomputation failed after a committed review write"
                );
                Err(CatalogError::Inconsistent {
                    book_id: guard.book_id(),
                    reason: format!("{} committed but recomputation failed: {}", operation, err),
                })
            }
        }
    }
}
