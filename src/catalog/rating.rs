//! Rating summary recomputation.
//!
//! Summaries are always rebuilt from the full review set of a book rather
//! than adjusted incrementally, so any earlier drift is overwritten by the
//! next recomputation.

use std::sync::Arc;

use bookshelf_db::DbResult;

use super::locks::BookGuard;
use super::models::{BookId, RatingSummary};
use super::store::CatalogStore;

/// Mean of `ratings` in tenths, rounded half-up.
///
/// Integer arithmetic keeps exact halves such as 4.25 or 3.45 from being
/// rounded the wrong way by binary floating point.
pub fn summarize<I>(ratings: I) -> RatingSummary
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), rating| {
            (sum + u64::from(rating), count + 1)
        });

    if count == 0 {
        return RatingSummary::default();
    }

    // round(sum * 10 / count) with halves going up
    let tenths = (sum * 20 + count) / (count * 2);
    RatingSummary {
        average_rating: tenths as f64 / 10.0,
        total_reviews: count,
    }
}

/// Recomputes and persists a book's rating summary
#[derive(Clone)]
pub struct RatingEngine {
    store: Arc<dyn CatalogStore>,
}

impl RatingEngine {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Rebuild the summary of the guarded book from its current reviews.
    ///
    /// Returns `None` without writing when the book no longer exists.
    pub async fn recompute(&self, guard: &BookGuard) -> DbResult<Option<RatingSummary>> {
        let book_id: BookId = guard.book_id();

        let reviews = self.store.reviews_for_book(&book_id).await?;
        let summary = summarize(reviews.iter().map(|review| review.rating));

        let written = self.store.set_rating_summary(&book_id, summary).await?;
        match written {
            Some(_) => {
                tracing::debug!(
                    book_id = %book_id,
                    average_rating = summary.average_rating,
                    total_reviews = summary.total_reviews,
                    "rating summary recomputed"
                );
                Ok(Some(summary))
            }
            None => {
                tracing::debug!(book_id = %book_id, "book gone, recomputation skipped");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::locks::BookLocks;
    use crate::catalog::models::{
        Book, BookDetails, Review, ReviewContent, UserId, DEFAULT_LANGUAGE,
    };
    use crate::catalog::store::MemoryCatalogStore;
    use chrono::{NaiveDate, Utc};

    fn summary(average_rating: f64, total_reviews: u64) -> RatingSummary {
        RatingSummary {
            average_rating,
            total_reviews,
        }
    }

    #[test]
    fn empty_set_is_zero() {
        assert_eq!(summarize(Vec::<u8>::new()), RatingSummary::default());
    }

    #[test]
    fn mean_is_rounded_to_one_decimal() {
        assert_eq!(summarize([4]), summary(4.0, 1));
        assert_eq!(summarize([4, 5]), summary(4.5, 2));
        assert_eq!(summarize([1, 2, 2]), summary(1.7, 3));
        assert_eq!(summarize([5, 5, 4]), summary(4.7, 3));
    }

    #[test]
    fn halves_round_up() {
        // 4.25 -> 4.3
        assert_eq!(summarize([5, 5, 4, 3]), summary(4.3, 4));
        // 3.45 -> 3.5
        let mut ratings = vec![3u8; 11];
        ratings.extend([4u8; 9]);
        assert_eq!(summarize(ratings), summary(3.5, 20));
    }

    async fn seeded() -> (Arc<MemoryCatalogStore>, BookId) {
        let store = Arc::new(MemoryCatalogStore::new());
        let book = Book::new(
            BookDetails {
                title: "Kindred".to_string(),
                author: "Octavia E. Butler".to_string(),
                genre: "Fiction".to_string(),
                description: "Time travel to antebellum Maryland".to_string(),
                published_date: NaiveDate::from_ymd_opt(1979, 6, 1).unwrap(),
                isbn: None,
                page_count: None,
                language: DEFAULT_LANGUAGE.to_string(),
            },
            UserId::new("creator"),
            Utc::now(),
        );
        let book_id = store.insert_book(book).await.unwrap().id;
        for (user, rating) in [("u1", 4u8), ("u2", 5), ("u3", 3)] {
            store
                .insert_review(Review::new(
                    book_id,
                    UserId::new(user),
                    ReviewContent {
                        rating,
                        comment: "Left a mark on me".to_string(),
                    },
                    Utc::now(),
                ))
                .await
                .unwrap();
        }
        (store, book_id)
    }

    #[tokio::test]
    async fn recompute_persists_summary_idempotently() {
        let (store, book_id) = seeded().await;
        let engine = RatingEngine::new(store.clone());
        let locks = BookLocks::new();

        let guard = locks.acquire(book_id).await;
        let first = engine.recompute(&guard).await.unwrap().unwrap();
        let stored_first = store.get_book(&book_id).await.unwrap().unwrap().rating;
        let second = engine.recompute(&guard).await.unwrap().unwrap();
        let stored_second = store.get_book(&book_id).await.unwrap().unwrap().rating;

        assert_eq!(first, summary(4.0, 3));
        assert_eq!(first, second);
        assert_eq!(stored_first, stored_second);
    }

    #[tokio::test]
    async fn recompute_heals_drift() {
        let (store, book_id) = seeded().await;
        store
            .set_rating_summary(&book_id, summary(1.0, 99))
            .await
            .unwrap();

        let engine = RatingEngine::new(store.clone());
        let locks = BookLocks::new();
        let guard = locks.acquire(book_id).await;
        engine.recompute(&guard).await.unwrap();

        let rating = store.get_book(&book_id).await.unwrap().unwrap().rating;
        assert_eq!(rating, summary(4.0, 3));
    }

    #[tokio::test]
    async fn missing_book_is_a_no_op() {
        let store = Arc::new(MemoryCatalogStore::new());
        let engine = RatingEngine::new(store);
        let locks = BookLocks::new();
        let guard = locks.acquire(BookId::new()).await;
        assert_eq!(engine.recompute(&guard).await.unwrap(), None);
    }
}
