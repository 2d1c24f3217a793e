//! Review mutations.
//!
//! Each operation validates, checks its guards, writes the review and then
//! recomputes the book's summary before returning. The write and the
//! recomputation happen inside the book's scoped section, and the
//! one-review-per-user rule is enforced by the store's unique index, not by
//! a lookup before the insert.

use chrono::Utc;

use bookshelf_authz::Actor;

use super::error::{CatalogError, CatalogResult};
use super::models::{BookId, DeletedReview, Review, ReviewId, ReviewInput, ReviewOutcome};
use super::validation;
use super::CatalogService;

impl CatalogService {
    pub async fn create_review(
        &self,
        actor: &Actor,
        book_id: BookId,
        input: ReviewInput,
    ) -> CatalogResult<ReviewOutcome> {
        let content = validation::review_content(&input)?;

        let guard = self.locks.acquire(book_id).await;
        if self.store.get_book(&book_id).await?.is_none() {
            return Err(CatalogError::book_not_found(book_id));
        }

        let review = Review::new(book_id, actor.user_id.clone(), content, Utc::now());
        let review = match self.store.insert_review(review).await {
            Ok(review) => review,
            Err(err) => {
                let err = CatalogError::from(err);
                if matches!(err, CatalogError::Conflict(_)) {
                    tracing::info!(
                        book_id = %book_id,
                        user_id = %actor.user_id,
                        "duplicate review rejected"
                    );
                }
                return Err(err);
            }
        };

        let book_rating = self.finish_mutation(&guard, "create_review").await?;

        tracing::info!(
            review_id = %review.id,
            book_id = %book_id,
            user_id = %actor.user_id,
            rating = review.rating,
            "review created"
        );
        Ok(ReviewOutcome {
            review,
            book_rating,
        })
    }

    pub async fn update_review(
        &self,
        actor: &Actor,
        review_id: ReviewId,
        input: ReviewInput,
    ) -> CatalogResult<ReviewOutcome> {
        let content = validation::review_content(&input)?;
        let existing = self.owned_review(actor, &review_id).await?;

        let guard = self.locks.acquire(existing.book_id).await;
        let review = self
            .store
            .update_review_content(&review_id, content, Utc::now())
            .await?
            // deleted between the ownership check and the lock
            .ok_or(CatalogError::NotFoundOrUnauthorized)?;

        let book_rating = self.finish_mutation(&guard, "update_review").await?;

        tracing::info!(
            review_id = %review_id,
            book_id = %review.book_id,
            user_id = %actor.user_id,
            rating = review.rating,
            "review updated"
        );
        Ok(ReviewOutcome {
            review,
            book_rating,
        })
    }

    pub async fn delete_review(
        &self,
        actor: &Actor,
        review_id: ReviewId,
    ) -> CatalogResult<DeletedReview> {
        let existing = self.owned_review(actor, &review_id).await?;

        let guard = self.locks.acquire(existing.book_id).await;
        if self.store.delete_review(&review_id).await?.is_none() {
            return Err(CatalogError::NotFoundOrUnauthorized);
        }

        let book_rating = self.finish_mutation(&guard, "delete_review").await?;

        tracing::info!(
            review_id = %review_id,
            book_id = %existing.book_id,
            user_id = %actor.user_id,
            "review deleted"
        );
        Ok(DeletedReview {
            review_id,
            book_id: existing.book_id,
            book_rating,
        })
    }

    /// Bump a review's helpfulness counter; ratings are unaffected so no
    /// recomputation follows
    pub async fn mark_helpful(&self, review_id: ReviewId) -> CatalogResult<Review> {
        self.store
            .increment_helpful(&review_id)
            .await?
            .ok_or_else(|| CatalogError::review_not_found(review_id))
    }

    /// The review if `actor` may change it; missing and foreign reviews are
    /// indistinguishable to the caller
    async fn owned_review(&self, actor: &Actor, review_id: &ReviewId) -> CatalogResult<Review> {
        match self.store.get_review(review_id).await? {
            Some(review) if actor.can_modify(&review.user_id) => Ok(review),
            Some(_) => {
                tracing::debug!(
                    review_id = %review_id,
                    user_id = %actor.user_id,
                    "review mutation by non-owner rejected"
                );
                Err(CatalogError::NotFoundOrUnauthorized)
            }
            None => Err(CatalogError::NotFoundOrUnauthorized),
        }
    }
}
