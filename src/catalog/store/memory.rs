//! In-process catalog store over document tables

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookshelf_db::{DbResult, Document, IndexKey, Table};

use super::{
    isbn_key, review_pair_key, CatalogStore, BOOK_ISBN_INDEX, REVIEW_BOOK_INDEX,
    REVIEW_BOOK_USER_INDEX,
};
use crate::catalog::models::{
    Book, BookDetails, BookId, RatingSummary, Review, ReviewContent, ReviewId,
};

impl Document for Book {
    type Id = BookId;
    const TABLE: &'static str = "book";

    fn id(&self) -> &BookId {
        &self.id
    }

    fn unique_keys(&self) -> Vec<IndexKey> {
        self.details
            .isbn
            .as_deref()
            .map(|isbn| vec![IndexKey::new(BOOK_ISBN_INDEX, isbn_key(isbn))])
            .unwrap_or_default()
    }
}

impl Document for Review {
    type Id = ReviewId;
    const TABLE: &'static str = "review";

    fn id(&self) -> &ReviewId {
        &self.id
    }

    fn unique_keys(&self) -> Vec<IndexKey> {
        vec![IndexKey::new(REVIEW_BOOK_USER_INDEX, review_pair_key(self))]
    }

    fn index_keys(&self) -> Vec<IndexKey> {
        vec![IndexKey::new(REVIEW_BOOK_INDEX, self.book_id.to_string())]
    }
}

/// Catalog store backed by in-process document tables; nothing survives
/// the process
#[derive(Default)]
pub struct MemoryCatalogStore {
    books: Table<Book>,
    reviews: Table<Review>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn insert_book(&self, book: Book) -> DbResult<Book> {
        self.books.insert(book)
    }

    async fn get_book(&self, id: &BookId) -> DbResult<Option<Book>> {
        self.books.get(id)
    }

    async fn update_book_details(
        &self,
        id: &BookId,
        details: BookDetails,
        at: DateTime<Utc>,
    ) -> DbResult<Option<Book>> {
        self.books.update(id, |book| {
            book.details = details;
            book.updated_at = at;
        })
    }

    async fn set_rating_summary(
        &self,
        id: &BookId,
        summary: RatingSummary,
    ) -> DbResult<Option<Book>> {
        self.books.update(id, |book| book.rating = summary)
    }

    async fn delete_book(&self, id: &BookId) -> DbResult<bool> {
        Ok(self.books.remove(id)?.is_some())
    }

    async fn find_books(&self, filter: &(dyn for<'b> Fn(&'b Book) -> bool + Sync)) -> DbResult<Vec<Book>> {
        self.books.scan(filter)
    }

    async fn book_ids(&self) -> DbResult<Vec<BookId>> {
        self.books.ids()
    }

    async fn insert_review(&self, review: Review) -> DbResult<Review> {
        self.reviews.insert(review)
    }

    async fn get_review(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        self.reviews.get(id)
    }

    async fn update_review_content(
        &self,
        id: &ReviewId,
        content: ReviewContent,
        at: DateTime<Utc>,
    ) -> DbResult<Option<Review>> {
        self.reviews.update(id, |review| {
            review.rating = content.rating;
            review.comment = content.comment;
            review.updated_at = at;
        })
    }

    async fn increment_helpful(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        self.reviews
            .update(id, |review| review.helpful = review.helpful.saturating_add(1))
    }

    async fn delete_review(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        self.reviews.remove(id)
    }

    async fn reviews_for_book(&self, book_id: &BookId) -> DbResult<Vec<Review>> {
        self.reviews
            .find(REVIEW_BOOK_INDEX, &book_id.to_string())
    }

    async fn delete_reviews_for_book(&self, book_id: &BookId) -> DbResult<usize> {
        Ok(self
            .reviews
            .remove_indexed(REVIEW_BOOK_INDEX, &book_id.to_string())?
            .len())
    }
}
