//! Catalog state on the SQLite store across service restarts.

use bookshelf_app::catalog::{BookInput, CatalogService, ReviewInput};
use bookshelf_authz::Actor;
use bookshelf_kernel::{settings::Settings, InitCtx};
use chrono::NaiveDate;

/// SQLite file under the temp dir, removed with its WAL files on drop
struct ScratchDb(std::path::PathBuf);

impl ScratchDb {
    fn new() -> Self {
        let file = format!("bookshelf-restart-{}.db", uuid::Uuid::now_v7());
        Self(std::env::temp_dir().join(file))
    }

    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.database.url = format!("sqlite://{}", self.0.display());
        settings
    }
}

impl Drop for ScratchDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            std::fs::remove_file(path).ok();
        }
    }
}

fn book_input() -> BookInput {
    BookInput {
        title: "Solaris".to_string(),
        author: "Stanislaw Lem".to_string(),
        genre: "Science Fiction".to_string(),
        description: "An ocean that thinks".to_string(),
        published_date: NaiveDate::from_ymd_opt(1961, 1, 1).unwrap(),
        isbn: Some("978-0-15-602760-1".to_string()),
        ..BookInput::default()
    }
}

fn input(rating: i64) -> ReviewInput {
    ReviewInput {
        rating,
        comment: "Contact on its own terms".to_string(),
    }
}

#[tokio::test]
async fn books_and_reviews_survive_a_restart() {
    let db = ScratchDb::new();
    let settings = db.settings();

    let catalog = CatalogService::open(&settings).await.unwrap();
    let book_id = catalog
        .create_book(&Actor::user("creator"), book_input())
        .await
        .unwrap()
        .id;
    catalog
        .create_review(&Actor::user("u1"), book_id, input(4))
        .await
        .unwrap();
    catalog
        .create_review(&Actor::user("u2"), book_id, input(5))
        .await
        .unwrap();
    drop(catalog);

    let catalog = CatalogService::open(&settings).await.unwrap();
    let book = catalog.get_book(book_id).await.unwrap();
    assert_eq!(book.details.title, "Solaris");
    assert_eq!(book.rating.average_rating, 4.5);
    assert_eq!(book.rating.total_reviews, 2);
    assert_eq!(catalog.stored_reviews(book_id).await.unwrap().len(), 2);

    // uniqueness holds against rows written by the earlier process
    assert!(catalog
        .create_review(&Actor::user("u1"), book_id, input(1))
        .await
        .is_err());
    assert!(catalog
        .create_book(&Actor::user("someone"), book_input())
        .await
        .is_err());
}

#[tokio::test]
async fn startup_reconciles_summaries_left_stale_by_a_crash() {
    let db = ScratchDb::new();
    let settings = db.settings();

    let catalog = CatalogService::open(&settings).await.unwrap();
    let book_id = catalog
        .create_book(&Actor::user("creator"), book_input())
        .await
        .unwrap()
        .id;
    catalog
        .create_review(&Actor::user("u1"), book_id, input(2))
        .await
        .unwrap();
    drop(catalog);

    // a review row committed without its recomputation
    let pool = sqlx::SqlitePool::connect(&settings.database.url).await.unwrap();
    sqlx::query(
        "INSERT INTO reviews (id, book_id, user_id, rating, comment, helpful, created_at, updated_at) \
         VALUES (?, ?, 'u2', 5, 'written before the crash', 0, ?, ?)",
    )
    .bind(uuid::Uuid::now_v7().to_string())
    .bind(book_id.to_string())
    .bind(chrono::Utc::now())
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let registry = bookshelf_app::build_registry(&settings).await.unwrap();
    let ctx = InitCtx::new(&settings);
    registry.init_all(&ctx).await.unwrap();
    registry.start_all(&ctx).await.unwrap();
    registry.stop_all().await.unwrap();

    let catalog = CatalogService::open(&settings).await.unwrap();
    let book = catalog.get_book(book_id).await.unwrap();
    assert_eq!(book.rating.average_rating, 3.5);
    assert_eq!(book.rating.total_reviews, 2);
}
