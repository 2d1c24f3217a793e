//! Book mutations and rating reconciliation.
//!
//! Book deletion runs inside the book's scoped section so no review can be
//! created against a book whose cascade is in progress.

use chrono::Utc;

use bookshelf_authz::Actor;
use bookshelf_db::DbError;

use super::error::{CatalogError, CatalogResult};
use super::models::{
    Book, BookId, BookInput, CascadeReport, ReconcileOutcome, ReconcileReport,
};
use super::validation;
use super::CatalogService;

impl CatalogService {
    pub async fn create_book(&self, actor: &Actor, input: BookInput) -> CatalogResult<Book> {
        let details = validation::book_details(&input)?;
        let book = self
            .store
            .insert_book(Book::new(details, actor.user_id.clone(), Utc::now()))
            .await?;

        tracing::info!(
            book_id = %book.id,
            created_by = %actor.user_id,
            title = %book.details.title,
            "book created"
        );
        Ok(book)
    }

    /// Replace a book's descriptive fields. The rating summary is never
    /// touched here, so no section is needed.
    pub async fn update_book(
        &self,
        actor: &Actor,
        book_id: BookId,
        input: BookInput,
    ) -> CatalogResult<Book> {
        let details = validation::book_details(&input)?;
        let existing = self.require_book(&book_id).await?;
        if !actor.can_modify(&existing.created_by) {
            return Err(CatalogError::Forbidden(
                "Not authorized to update this book".to_string(),
            ));
        }

        let book = self
            .store
            .update_book_details(&book_id, details, Utc::now())
            .await?
            .ok_or_else(|| CatalogError::book_not_found(book_id))?;

        tracing::info!(book_id = %book_id, updated_by = %actor.user_id, "book updated");
        Ok(book)
    }

    /// Remove a book and every review that references it
    pub async fn delete_book(&self, actor: &Actor, book_id: BookId) -> CatalogResult<CascadeReport> {
        let existing = self.require_book(&book_id).await?;
        if !actor.can_modify(&existing.created_by) {
            return Err(CatalogError::Forbidden(
                "Not authorized to delete this book".to_string(),
            ));
        }

        let _guard = self.locks.acquire(book_id).await;
        // a concurrent delete may have won while we waited
        self.require_book(&book_id).await?;

        let reviews_removed = self
            .store
            .delete_reviews_for_book(&book_id)
            .await
            .map_err(|err| cascade_failed(book_id, "removing reviews", err))?;

        self.store.delete_book(&book_id).await.map_err(|err| {
            cascade_failed(
                book_id,
                &format!("removing the book after {} reviews were removed", reviews_removed),
                err,
            )
        })?;

        tracing::info!(
            book_id = %book_id,
            deleted_by = %actor.user_id,
            reviews_removed,
            "book deleted"
        );
        Ok(CascadeReport {
            book_id,
            reviews_removed,
        })
    }

    /// Privileged entry point for [`CatalogService::reconcile`]
    pub async fn reconcile_book(
        &self,
        actor: &Actor,
        book_id: BookId,
    ) -> CatalogResult<ReconcileOutcome> {
        if !actor.is_privileged() {
            return Err(CatalogError::Forbidden(
                "Reconciliation requires an administrator".to_string(),
            ));
        }
        self.reconcile(book_id).await
    }

    /// Re-run recomputation for one book and report whether the stored
    /// summary had drifted
    pub async fn reconcile(&self, book_id: BookId) -> CatalogResult<ReconcileOutcome> {
        let guard = self.locks.acquire(book_id).await;
        let before = self.require_book(&book_id).await?.rating;
        let after = self
            .ratings
            .recompute(&guard)
            .await?
            .ok_or_else(|| CatalogError::book_not_found(book_id))?;

        let changed = before != after;
        if changed {
            tracing::warn!(
                book_id = %book_id,
                before_average = before.average_rating,
                before_total = before.total_reviews,
                after_average = after.average_rating,
                after_total = after.total_reviews,
                "stale rating summary corrected"
            );
        }
        Ok(ReconcileOutcome {
            book_id,
            before,
            after,
            changed,
        })
    }

    /// Reconcile every book. Stops at the first storage failure; books that
    /// disappear mid-sweep are counted, not treated as errors.
    pub async fn reconcile_all(&self) -> CatalogResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        for book_id in self.store.book_ids().await? {
            match self.reconcile(book_id).await {
                Ok(outcome) => {
                    report.scanned += 1;
                    if outcome.changed {
                        report.corrected += 1;
                    }
                }
                Err(CatalogError::NotFound { .. }) => report.vanished += 1,
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            scanned = report.scanned,
            corrected = report.corrected,
            vanished = report.vanished,
            "reconciliation sweep finished"
        );
        Ok(report)
    }
}

fn cascade_failed(book_id: BookId, step: &str, err: DbError) -> CatalogError {
    tracing::error!(
        alert = true,
        book_id = %book_id,
        step,
        error = %err,
        "book deletion cascade failed"
    );
    CatalogError::Inconsistent {
        book_id,
        reason: format!("book deletion failed while {}: {}", step, err),
    }
}
