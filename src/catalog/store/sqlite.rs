//! SQLite-backed catalog store.
//!
//! Uniqueness lives in the schema: `reviews` carries `UNIQUE (book_id,
//! user_id)` and `books` a partial unique index over the ISBN digits. A
//! violated constraint comes back as [`DbError::Duplicate`] naming the same
//! index the in-process store uses, so callers cannot tell the two apart.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use bookshelf_db::{pool, DbError, DbResult, SqlitePool};
use bookshelf_kernel::settings::DatabaseSettings;

use super::{isbn_key, review_pair_key, CatalogStore, BOOK_ISBN_INDEX, REVIEW_BOOK_USER_INDEX};
use crate::catalog::models::{
    Book, BookDetails, BookId, RatingSummary, Review, ReviewContent, ReviewId, UserId,
};

const BOOK_COLUMNS: &str = "id, title, author, genre, description, published_date, isbn, \
     page_count, language, average_rating, total_reviews, created_by, created_at, updated_at";

const REVIEW_COLUMNS: &str =
    "id, book_id, user_id, rating, comment, helpful, created_at, updated_at";

/// Catalog store on a SQLite database file
#[derive(Clone)]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    /// Wrap a pool whose schema is already migrated
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `settings.url` and apply pending migrations
    pub async fn open(settings: &DatabaseSettings) -> DbResult<Self> {
        Ok(Self::new(pool::connect(settings).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse<T>(column: &'static str, raw: &str) -> DbResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|err| DbError::Backend(format!("{} holds {:?}: {}", column, raw, err)))
}

fn convert<T, U>(column: &'static str, value: U) -> DbResult<T>
where
    T: TryFrom<U>,
    U: Copy + fmt::Display,
{
    T::try_from(value)
        .map_err(|_| DbError::Backend(format!("{} out of range: {}", column, value)))
}

fn book_from_row(row: &SqliteRow) -> DbResult<Book> {
    let id: String = row.try_get("id")?;
    let page_count: Option<i64> = row.try_get("page_count")?;
    let total_reviews: i64 = row.try_get("total_reviews")?;
    let created_by: String = row.try_get("created_by")?;

    Ok(Book {
        id: parse("books.id", &id)?,
        details: BookDetails {
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            genre: row.try_get("genre")?,
            description: row.try_get("description")?,
            published_date: row.try_get("published_date")?,
            isbn: row.try_get("isbn")?,
            page_count: page_count
                .map(|pages| convert("books.page_count", pages))
                .transpose()?,
            language: row.try_get("language")?,
        },
        rating: RatingSummary {
            average_rating: row.try_get("average_rating")?,
            total_reviews: convert("books.total_reviews", total_reviews)?,
        },
        created_by: UserId::new(created_by),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn review_from_row(row: &SqliteRow) -> DbResult<Review> {
    let id: String = row.try_get("id")?;
    let book_id: String = row.try_get("book_id")?;
    let user_id: String = row.try_get("user_id")?;
    let rating: i64 = row.try_get("rating")?;
    let helpful: i64 = row.try_get("helpful")?;

    Ok(Review {
        id: parse("reviews.id", &id)?,
        book_id: parse("reviews.book_id", &book_id)?,
        user_id: UserId::new(user_id),
        rating: convert("reviews.rating", rating)?,
        comment: row.try_get("comment")?,
        helpful: convert("reviews.helpful", helpful)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn insert_book(&self, book: Book) -> DbResult<Book> {
        let key = book.details.isbn.as_deref().map(isbn_key);
        let sql = format!(
            "INSERT INTO books ({}, isbn_key) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            BOOK_COLUMNS
        );

        sqlx::query(&sql)
            .bind(book.id.to_string())
            .bind(book.details.title.as_str())
            .bind(book.details.author.as_str())
            .bind(book.details.genre.as_str())
            .bind(book.details.description.as_str())
            .bind(book.details.published_date)
            .bind(book.details.isbn.as_deref())
            .bind(book.details.page_count.map(i64::from))
            .bind(book.details.language.as_str())
            .bind(book.rating.average_rating)
            .bind(convert::<i64, _>("books.total_reviews", book.rating.total_reviews)?)
            .bind(book.created_by.as_str())
            .bind(book.created_at)
            .bind(book.updated_at)
            .bind(key.as_deref())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                DbError::on_unique(err, "book", BOOK_ISBN_INDEX, || key.clone().unwrap_or_default())
            })?;

        Ok(book)
    }

    async fn get_book(&self, id: &BookId) -> DbResult<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS);
        sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| book_from_row(&row))
            .transpose()
    }

    async fn update_book_details(
        &self,
        id: &BookId,
        details: BookDetails,
        at: DateTime<Utc>,
    ) -> DbResult<Option<Book>> {
        let key = details.isbn.as_deref().map(isbn_key);
        let sql = format!(
            "UPDATE books SET title = ?, author = ?, genre = ?, description = ?, \
             published_date = ?, isbn = ?, isbn_key = ?, page_count = ?, language = ?, \
             updated_at = ? WHERE id = ? RETURNING {}",
            BOOK_COLUMNS
        );

        sqlx::query(&sql)
            .bind(details.title.as_str())
            .bind(details.author.as_str())
            .bind(details.genre.as_str())
            .bind(details.description.as_str())
            .bind(details.published_date)
            .bind(details.isbn.as_deref())
            .bind(key.as_deref())
            .bind(details.page_count.map(i64::from))
            .bind(details.language.as_str())
            .bind(at)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                DbError::on_unique(err, "book", BOOK_ISBN_INDEX, || key.clone().unwrap_or_default())
            })?
            .map(|row| book_from_row(&row))
            .transpose()
    }

    async fn set_rating_summary(
        &self,
        id: &BookId,
        summary: RatingSummary,
    ) -> DbResult<Option<Book>> {
        let sql = format!(
            "UPDATE books SET average_rating = ?, total_reviews = ? WHERE id = ? RETURNING {}",
            BOOK_COLUMNS
        );

        sqlx::query(&sql)
            .bind(summary.average_rating)
            .bind(convert::<i64, _>("books.total_reviews", summary.total_reviews)?)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| book_from_row(&row))
            .transpose()
    }

    async fn delete_book(&self, id: &BookId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_books(&self, filter: &(dyn for<'b> Fn(&'b Book) -> bool + Sync)) -> DbResult<Vec<Book>> {
        let sql = format!("SELECT {} FROM books", BOOK_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut books = Vec::new();
        for row in &rows {
            let book = book_from_row(row)?;
            if filter(&book) {
                books.push(book);
            }
        }
        Ok(books)
    }

    async fn book_ids(&self) -> DbResult<Vec<BookId>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM books")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|(id,)| parse("books.id", id)).collect()
    }

    async fn insert_review(&self, review: Review) -> DbResult<Review> {
        let sql = format!(
            "INSERT INTO reviews ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            REVIEW_COLUMNS
        );

        sqlx::query(&sql)
            .bind(review.id.to_string())
            .bind(review.book_id.to_string())
            .bind(review.user_id.as_str())
            .bind(i64::from(review.rating))
            .bind(review.comment.as_str())
            .bind(i64::from(review.helpful))
            .bind(review.created_at)
            .bind(review.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                DbError::on_unique(err, "review", REVIEW_BOOK_USER_INDEX, || {
                    review_pair_key(&review)
                })
            })?;

        Ok(review)
    }

    async fn get_review(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        let sql = format!("SELECT {} FROM reviews WHERE id = ?", REVIEW_COLUMNS);
        sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| review_from_row(&row))
            .transpose()
    }

    async fn update_review_content(
        &self,
        id: &ReviewId,
        content: ReviewContent,
        at: DateTime<Utc>,
    ) -> DbResult<Option<Review>> {
        let sql = format!(
            "UPDATE reviews SET rating = ?, comment = ?, updated_at = ? WHERE id = ? RETURNING {}",
            REVIEW_COLUMNS
        );

        sqlx::query(&sql)
            .bind(i64::from(content.rating))
            .bind(content.comment.as_str())
            .bind(at)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| review_from_row(&row))
            .transpose()
    }

    async fn increment_helpful(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        let sql = format!(
            "UPDATE reviews SET helpful = helpful + 1 WHERE id = ? RETURNING {}",
            REVIEW_COLUMNS
        );

        sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| review_from_row(&row))
            .transpose()
    }

    async fn delete_review(&self, id: &ReviewId) -> DbResult<Option<Review>> {
        let sql = format!("DELETE FROM reviews WHERE id = ? RETURNING {}", REVIEW_COLUMNS);
        sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| review_from_row(&row))
            .transpose()
    }

    async fn reviews_for_book(&self, book_id: &BookId) -> DbResult<Vec<Review>> {
        let sql = format!("SELECT {} FROM reviews WHERE book_id = ?", REVIEW_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(book_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn delete_reviews_for_book(&self, book_id: &BookId) -> DbResult<usize> {
        let result = sqlx::query("DELETE FROM reviews WHERE book_id = ?")
            .bind(book_id.to_string())
            .execute(&self.pool)
            .await?;
        convert("reviews removed", result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::DEFAULT_LANGUAGE;
    use crate::catalog::testing::ScratchDb;
    use chrono::NaiveDate;

    fn book(isbn: Option<&str>) -> Book {
        Book::new(
            BookDetails {
                title: "The Name of the Rose".to_string(),
                author: "Umberto Eco".to_string(),
                genre: "Mystery".to_string(),
                description: "Murders in a medieval abbey".to_string(),
                published_date: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
                isbn: isbn.map(str::to_string),
                page_count: Some(512),
                language: DEFAULT_LANGUAGE.to_string(),
            },
            UserId::new("creator"),
            Utc::now(),
        )
    }

    fn review(book_id: BookId, user: &str, rating: u8) -> Review {
        Review::new(
            book_id,
            UserId::new(user),
            ReviewContent {
                rating,
                comment: "The library is the labyrinth".to_string(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn records_survive_reopening_the_database() {
        let db = ScratchDb::new();
        let store = db.open().await;
        let stored = store.insert_book(book(Some("978-0-15-144647-6"))).await.unwrap();
        let summary = RatingSummary {
            average_rating: 4.5,
            total_reviews: 2,
        };
        store.insert_review(review(stored.id, "u1", 4)).await.unwrap();
        store.insert_review(review(stored.id, "u2", 5)).await.unwrap();
        store.set_rating_summary(&stored.id, summary).await.unwrap();
        store.pool().close().await;

        let reopened = db.open().await;
        let book = reopened.get_book(&stored.id).await.unwrap().unwrap();
        assert_eq!(book.details, stored.details);
        assert_eq!(book.rating, summary);
        assert_eq!(book.created_by.as_str(), "creator");
        assert_eq!(reopened.reviews_for_book(&stored.id).await.unwrap().len(), 2);
        assert_eq!(reopened.book_ids().await.unwrap(), vec![stored.id]);
    }

    #[tokio::test]
    async fn isbn_is_unique_and_sparse() {
        let db = ScratchDb::new();
        let store = db.open().await;
        store.insert_book(book(None)).await.unwrap();
        store.insert_book(book(None)).await.unwrap();
        let first = store.insert_book(book(Some("0-306-40615-2"))).await.unwrap();

        let err = store
            .insert_book(book(Some("0306406152")))
            .await
            .unwrap_err();
        assert_eq!(err.duplicate_index(), Some(BOOK_ISBN_INDEX));

        let other = store.insert_book(book(None)).await.unwrap();
        let err = store
            .update_book_details(&other.id, first.details.clone(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.duplicate_index(), Some(BOOK_ISBN_INDEX));
    }

    #[tokio::test]
    async fn one_review_per_book_and_user() {
        let db = ScratchDb::new();
        let store = db.open().await;
        let b = store.insert_book(book(None)).await.unwrap();

        store.insert_review(review(b.id, "u1", 4)).await.unwrap();
        let err = store
            .insert_review(review(b.id, "u1", 2))
            .await
            .unwrap_err();
        assert_eq!(err.duplicate_index(), Some(REVIEW_BOOK_USER_INDEX));

        store.insert_review(review(b.id, "u2", 2)).await.unwrap();
        assert_eq!(store.reviews_for_book(&b.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_duplicate_inserts_admit_one() {
        let db = ScratchDb::new();
        let store = db.open().await;
        let b = store.insert_book(book(None)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_review(review(b.id, "u1", 3)).await
            }));
        }
        let mut admitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(err) => assert_eq!(err.duplicate_index(), Some(REVIEW_BOOK_USER_INDEX)),
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn summary_and_detail_writes_touch_only_their_columns() {
        let db = ScratchDb::new();
        let store = db.open().await;
        let b = store.insert_book(book(None)).await.unwrap();
        let summary = RatingSummary {
            average_rating: 3.7,
            total_reviews: 3,
        };

        let rated = store.set_rating_summary(&b.id, summary).await.unwrap().unwrap();
        assert_eq!(rated.details, b.details);
        assert_eq!(rated.updated_at, b.updated_at);

        let mut details = b.details.clone();
        details.title = "Il nome della rosa".to_string();
        details.page_count = None;
        let updated = store
            .update_book_details(&b.id, details, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.details.title, "Il nome della rosa");
        assert_eq!(updated.details.page_count, None);
        assert_eq!(updated.rating, summary);

        assert!(store
            .set_rating_summary(&BookId::new(), summary)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn review_updates_and_removal() {
        let db = ScratchDb::new();
        let store = db.open().await;
        let first = store.insert_book(book(None)).await.unwrap();
        let second = store.insert_book(book(None)).await.unwrap();
        let r = store.insert_review(review(first.id, "u1", 5)).await.unwrap();
        store.insert_review(review(first.id, "u2", 3)).await.unwrap();
        store.insert_review(review(second.id, "u1", 1)).await.unwrap();

        let edited = store
            .update_review_content(
                &r.id,
                ReviewContent {
                    rating: 2,
                    comment: "Slower than remembered".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.rating, 2);
        assert_eq!(edited.created_at, r.created_at);

        store.increment_helpful(&r.id).await.unwrap();
        let voted = store.increment_helpful(&r.id).await.unwrap().unwrap();
        assert_eq!(voted.helpful, 2);

        let removed = store.delete_review(&r.id).await.unwrap().unwrap();
        assert_eq!(removed.id, r.id);
        assert!(store.delete_review(&r.id).await.unwrap().is_none());

        assert_eq!(store.delete_reviews_for_book(&first.id).await.unwrap(), 1);
        assert!(store.reviews_for_book(&first.id).await.unwrap().is_empty());
        assert_eq!(store.reviews_for_book(&second.id).await.unwrap().len(), 1);

        assert!(store.delete_book(&first.id).await.unwrap());
        assert!(!store.delete_book(&first.id).await.unwrap());
    }

    #[tokio::test]
    async fn find_books_applies_the_filter() {
        let db = ScratchDb::new();
        let store = db.open().await;
        store.insert_book(book(None)).await.unwrap();
        let mut other = book(None);
        other.details.author = "Italo Calvino".to_string();
        store.insert_book(other).await.unwrap();

        let found = store
            .find_books(&|b: &Book| b.details.author.starts_with("Italo"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
