//! SQLite connection pools and schema migrations

use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

pub use sqlx::SqlitePool;

use bookshelf_kernel::settings::DatabaseSettings;

use crate::error::{DbError, DbResult};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a pool on the database at `settings.url`, creating the file if it
/// does not exist, and bring its schema up to date.
///
/// Every connection of the pool must see the same database, so
/// `sqlite::memory:` only works with `max_connections = 1`.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .map_err(|err| DbError::Backend(format!("invalid database url {}: {}", settings.url, err)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(settings.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    tracing::info!(
        url = %settings.url,
        max_connections = settings.max_connections,
        "sqlite pool ready"
    );
    Ok(pool)
}

/// Apply pending migrations; already-applied ones are skipped
pub async fn migrate(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}
