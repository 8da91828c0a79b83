//! Database initialization and table definitions
//!
//! This module opens the storage handles the repositories consume: the
//! embedded redb document store and the SQLite relational store. It also
//! picks a repository implementation from configuration.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};
use rusqlite::Connection;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::error::StorageError;
use crate::repository::{
    BookmarkRepository, DocumentBookmarkRepository, InMemoryBookmarkRepository,
    SqliteBookmarkRepository,
};

/// Main table for bookmark documents
///
/// Key: bookmark id
/// Value: JSON-serialized `Bookmark`
pub const TABLE_BOOKMARKS: TableDefinition<&str, &str> = TableDefinition::new("bookmarks_v1");

/// Composite key of `TABLE_USER_INDEX`: `(user_id, archived, created_at_micros, id)`
pub type UserIndexKey<'a> = (&'a str, bool, i64, &'a str);

/// Index table for listing a user's bookmarks newest first
///
/// Key: `(user_id, archived, created_at in microseconds, id)`
/// Value: bookmark id
///
/// The tuple key compares field by field, so a `(user_id, archived)` range
/// never picks up entries of another user whatever characters the ids hold.
pub const TABLE_USER_INDEX: TableDefinition<UserIndexKey<'static>, &str> =
    TableDefinition::new("user_index_v2");

const SQLITE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bookmarks (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    main_image_url TEXT NOT NULL DEFAULT '',
    content_summary TEXT NOT NULL DEFAULT '',
    is_archived INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_bookmarks_user_archived_created
    ON bookmarks (user_id, is_archived, created_at DESC);
";

/// Initializes the embedded redb database and creates the bookmark tables
///
/// This function:
/// 1. Creates or opens the database file at the specified path
/// 2. Creates `TABLE_BOOKMARKS` and `TABLE_USER_INDEX` if they don't exist
/// 3. Commits the transaction to persist the table definitions
///
/// # Arguments
///
/// * `db_path` - Path to the database file
///
/// # Returns
///
/// The opened database, or a `StorageError` if the file cannot be opened or
/// the tables cannot be created.
///
/// # Example
///
/// ```no_run
/// # use athena::database::init_db;
/// let db = init_db("athena.redb").expect("Failed to initialize database");
/// ```
pub fn init_db<P: AsRef<Path>>(db_path: P) -> Result<Database, StorageError> {
    let db = Database::create(db_path)?;

    // Opening a table inside a write transaction creates it
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_BOOKMARKS)?;
        write_txn.open_table(TABLE_USER_INDEX)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Opens (or creates) a SQLite database file and applies the bookmark schema.
pub fn open_sqlite<P: AsRef<Path>>(path: P) -> Result<Connection, StorageError> {
    let conn = Connection::open(path)?;
    apply_sqlite_schema(&conn)?;
    Ok(conn)
}

/// Opens a private in-memory SQLite database with the bookmark schema.
pub fn open_sqlite_in_memory() -> Result<Connection, StorageError> {
    let conn = Connection::open_in_memory()?;
    apply_sqlite_schema(&conn)?;
    Ok(conn)
}

fn apply_sqlite_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(SQLITE_SCHEMA)?;
    Ok(())
}

/// Builds the repository selected by `config.backend`
///
/// # Arguments
///
/// * `config` - Supplies the backend kind and, for sqlite and redb, the
///   database file path
///
/// # Returns
///
/// A shared repository handle, or the `StorageError` raised while opening
/// the database.
pub fn open_repository(config: &Config) -> Result<Arc<dyn BookmarkRepository>, StorageError> {
    let repo: Arc<dyn BookmarkRepository> = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryBookmarkRepository::new()),
        StorageBackend::Sqlite => {
            Arc::new(SqliteBookmarkRepository::new(open_sqlite(&config.database_url)?))
        }
        StorageBackend::Redb => Arc::new(DocumentBookmarkRepository::new(Arc::new(init_db(
            &config.database_url,
        )?))),
    };

    info!(backend = %config.backend, path = %config.database_url, "storage backend ready");
    Ok(repo)
}
