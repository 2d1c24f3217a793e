//! Record store boundary.
//!
//! [`SqliteCatalogStore`] is what the service runs on. [`MemoryCatalogStore`]
//! keeps everything in process and exists for tests.

mod memory;
mod sqlite;

pub use memory::MemoryCatalogStore;
pub use sqlite::SqliteCatalogStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookshelf_db::DbResult;

use super::models::{Book, BookDetails, BookId, RatingSummary, Review, ReviewContent, ReviewId};

pub const BOOK_ISBN_INDEX: &str = "book_isbn";
pub const REVIEW_BOOK_USER_INDEX: &str = "review_book_user";
pub const REVIEW_BOOK_INDEX: &str = "review_book";

/// ISBNs compare without hyphens, so `0-306-40615-2` and `0306406152`
/// claim the same index entry
pub fn isbn_key(isbn: &str) -> String {
    isbn.chars().filter(char::is_ascii_digit).collect()
}

fn review_pair_key(review: &Review) -> String {
    format!("{}:{}", review.book_id, review.user_id)
}

/// Storage operations the catalog needs.
///
/// Every method is a single atomic call against one collection; nothing here
/// spans books and reviews. Review inserts must reject a second review for
/// the same `(book, user)` pair with a duplicate-key error raised by the
/// store itself.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_book(&self, book: Book) -> DbResult<Book>;

    async fn get_book(&self, id: &BookId) -> DbResult<Option<Book>>;

    /// Replace descriptive fields, leaving the rating summary untouched
    async fn update_book_details(
        &self,
        id: &BookId,
        details: BookDetails,
        at: DateTime<Utc>,
    ) -> DbResult<Option<Book>>;

    /// Write the derived rating fields; `None` when the book is gone
    async fn set_rating_summary(
        &self,
        id: &BookId,
        summary: RatingSummary,
    ) -> DbResult<Option<Book>>;

    async fn delete_book(&self, id: &BookId) -> DbResult<bool>;

    /// Every book accepted by `filter`, unordered
    async fn find_books(&self, filter: &(dyn for<'b> Fn(&'b Book) -> bool + Sync)) -> DbResult<Vec<Book>>;

    async fn book_ids(&self) -> DbResult<Vec<BookId>>;

    async fn insert_review(&self, review: Review) -> DbResult<Review>;

    async fn get_review(&self, id: &ReviewId) -> DbResult<Option<Review>>;

    async fn update_review_content(
        &self,
        id: &ReviewId,
        content: ReviewContent,
        at: DateTime<Utc>,
    ) -> DbResult<Option<Review>>;

    async fn increment_helpful(&self, id: &ReviewId) -> DbResult<Option<Review>>;

    async fn delete_review(&self, id: &ReviewId) -> DbResult<Option<Review>>;

    /// Indexed lookup of a book's reviews, unordered
    async fn reviews_for_book(&self, book_id: &BookId) -> DbResult<Vec<Review>>;

    async fn delete_reviews_for_book(&self, book_id: &BookId) -> DbResult<usize>;
}
