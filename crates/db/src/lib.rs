//! Storage for bookshelf records.
//!
//! [`pool`] opens the SQLite database the service runs on and applies its
//! migrations. [`Table`] is an in-process document table used as a test
//! double; it keeps its unique and secondary indexes inside the same
//! critical section as the write, so a duplicate key is rejected by the
//! table itself rather than by a caller's check-then-insert.

pub mod error;
pub mod pool;
pub mod table;

pub use error::{DbError, DbResult};
pub use pool::SqlitePool;
pub use table::{Document, IndexKey, Table};
