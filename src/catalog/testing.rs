//! Test fixtures: a store wrapper with switchable failures, a service
//! built on top of it, and scratch SQLite databases.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use bookshelf_authz::Actor;
use bookshelf_db::{DbError, DbResult};
use bookshelf_kernel::settings::{CatalogSettings, DatabaseSettings};
use uuid::Uuid;

use super::models::{
    Book, BookDetails, BookId, BookInput, RatingSummary, Review, ReviewContent, ReviewId,
    ReviewInput,
};
use super::store::{CatalogStore, MemoryCatalogStore, SqliteCatalogStore};
use super::CatalogService;

/// In-memory store whose individual calls can be made to fail on demand
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryCatalogStore,
    rating_writes: AtomicBool,
    review_inserts: AtomicBool,
    review_cascade: AtomicBool,
    book_deletes: AtomicBool,
}

impl FlakyStore {
    pub fn fail_rating_writes(&self, fail: bool) {
        self.rating_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_review_inserts(&self, fail: bool) {
        self.review_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_review_cascade(&self, fail: bool) {
        self.review_cascade.store(fail, Ordering::SeqCst);
    }

    pub fn fail_book_deletes(&self, fail: bool) {
        self.book_deletes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, call: &str) -> DbResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(DbError::Unavailable(format!("{} failed (injected)", call)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogStore for FlakyStore {
    async fn insert_book(&self, book: Book) -> DbResult<Book> {
        self.inner.insert_book(book).await
    }

    async fn get_book(&self, id: &BookId) -> DbResult<Option<Book>> {
        self.inner.get_book(id).await
    }

    async fn update_book_details(
        &self,
        id: &BookId,
        details: BookDetails,
        at: DateTime<Utc>,
    ) -> DbResult<Option<Book>> {
        self.inner.update_book_details(id, details, at).await
    }

    async fn set_rating_summary(
        &self,
        id: &BookId,
        summary: RatingSummary,
    ) -> DbResult<Option<Book>> {
        Self::check(&self.rating_writes, "set_rating_summary")?;
        self.inner.set_rating_summary(id, summary).await
    }

    async fn delete_book(&self, id: &BookId) -> DbResult<bool> {
        Self::check(&self.book_deletes, "delete_book")?;
        self.inner.delete_book(id).await
    }

    async fn find_books(&self, filter: &(dyn for<'b> Fn(&'b Book) -> bool + Sync)) -> DbResult<Vec<Book>> {
        self.inner.find_books(filter).await
    }

    async fn book_ids(&self) -> DbResult<Vec<BookId>> {
        self.inner.book_ids().await
    }

    async fn insert_review(&self, review: Review) -> DbResult<Review> {
        Self::check(&self.review_inserts, "insert_review")?;
        self.inner.insert_review(review).await
    }

    async fn get_review(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        self.inner.get_review(id).await
    }

    async fn update_review_content(
        &self,
        id: &ReviewId,
        content: ReviewContent,
        at: DateTime<Utc>,
    ) -> DbResult<Option<Review>> {
        self.inner.update_review_content(id, content, at).await
    }

    async fn increment_helpful(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        self.inner.increment_helpful(id).await
    }

    async fn delete_review(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        self.inner.delete_review(id).await
    }

    async fn reviews_for_book(&self, book_id: &BookId) -> DbResult<Vec<Review>> {
        self.inner.reviews_for_book(book_id).await
    }

    async fn delete_reviews_for_book(&self, book_id: &BookId) -> DbResult<usize> {
        Self::check(&self.review_cascade, "delete_reviews_for_book")?;
        self.inner.delete_reviews_for_book(book_id).await
    }
}

pub struct Fixture {
    pub service: Arc<CatalogService>,
    pub store: Arc<FlakyStore>,
    pub creator: Actor,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(FlakyStore::default());
        let service = CatalogService::new(store.clone(), CatalogSettings::default());
        Self {
            service: Arc::new(service),
            store,
            creator: Actor::user("creator"),
        }
    }

    /// Create a book owned by `self.creator`
    pub async fn book(&self) -> BookId {
        self.titled("Fixture").await
    }

    pub async fn titled(&self, title: &str) -> BookId {
        self.service
            .create_book(&self.creator, book_input(title))
            .await
            .unwrap()
            .id
    }

    pub async fn rating(&self, book_id: BookId) -> RatingSummary {
        self.service.get_book(book_id).await.unwrap().rating
    }
}

pub fn book_input(title: &str) -> BookInput {
    BookInput {
        title: title.to_string(),
        author: "Jane Author".to_string(),
        genre: "Fiction".to_string(),
        description: "A book used by the catalog tests".to_string(),
        published_date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
        isbn: None,
        page_count: Some(200),
        language: None,
    }
}

pub fn review(rating: i64) -> ReviewInput {
    ReviewInput {
        rating,
        comment: "Solid read, would recommend".to_string(),
    }
}

/// A SQLite file under the temp dir, removed with its WAL files on drop
pub struct ScratchDb {
    path: PathBuf,
}

impl ScratchDb {
    pub fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("bookshelf-{}.db", Uuid::now_v7())),
        }
    }

    pub fn settings(&self) -> DatabaseSettings {
        DatabaseSettings {
            url: format!("sqlite://{}", self.path.display()),
            ..DatabaseSettings::default()
        }
    }

    pub async fn open(&self) -> SqliteCatalogStore {
        SqliteCatalogStore::open(&self.settings()).await.unwrap()
    }
}

impl Drop for ScratchDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            std::fs::remove_file(path).ok();
        }
    }
}
