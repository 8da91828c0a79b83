//! Relational backend on SQLite
//!
//! Each operation is a single statement, so there is no multi-statement
//! transaction to reason about. Timestamps are stored as microseconds since
//! the epoch, which keeps `ORDER BY created_at DESC` numeric and makes
//! Create → Get round-trip exactly.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use tracing::debug;

use crate::error::{RepoError, RepoResult, StorageError};
use crate::model::{self, Bookmark, BookmarkQuery};
use crate::repository::BookmarkRepository;

const BOOKMARK_COLUMNS: &str = "id, user_id, url, title, main_image_url, content_summary, \
     is_archived, created_at, updated_at";

/// Number of fresh ids tried before an insert collision is reported.
const MAX_ID_ATTEMPTS: usize = 5;

/// SQLite-backed bookmark repository.
///
/// Consumes a connection whose schema is already in place (see
/// `database::open_sqlite`). The connection is not `Sync`, so it sits
/// behind a mutex.
pub struct SqliteBookmarkRepository {
    conn: Mutex<Connection>,
}

impl SqliteBookmarkRepository {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}

fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {micros}").into(),
        )
    })
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        main_image_url: row.get("main_image_url")?,
        content_summary: row.get("content_summary")?,
        is_archived: row.get("is_archived")?,
        created_at: from_micros(row.get("created_at")?)?,
        updated_at: from_micros(row.get("updated_at")?)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn insert(conn: &Connection, bookmark: &Bookmark) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO bookmarks (
            id,
            user_id,
            url,
            title,
            main_image_url,
            content_summary,
            is_archived,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            bookmark.id,
            bookmark.user_id,
            bookmark.url,
            bookmark.title,
            bookmark.main_image_url,
            bookmark.content_summary,
            bookmark.is_archived,
            to_micros(bookmark.created_at),
            to_micros(bookmark.updated_at),
        ],
    )
}

impl BookmarkRepository for SqliteBookmarkRepository {
    /// Inserts the bookmark. A generated id that collides is replaced and the
    /// insert retried, up to `MAX_ID_ATTEMPTS` times; a caller-supplied id
    /// that collides is a `Conflict`.
    fn create(&self, mut bookmark: Bookmark) -> RepoResult<Bookmark> {
        bookmark.stamp_for_create(model::now());
        let conn = self.conn()?;

        if !bookmark.id.is_empty() {
            return match insert(&conn, &bookmark) {
                Ok(_) => Ok(bookmark),
                Err(err) if is_unique_violation(&err) => Err(RepoError::Conflict(bookmark.id)),
                Err(err) => Err(err.into()),
            };
        }

        for _ in 0..MAX_ID_ATTEMPTS {
            bookmark.id = model::generate_id();
            match insert(&conn, &bookmark) {
                Ok(_) => {
                    debug!(id = %bookmark.id, user_id = %bookmark.user_id, "sqlite: created bookmark");
                    return Ok(bookmark);
                }
                Err(err) if is_unique_violation(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(RepoError::Conflict(bookmark.id))
    }

    fn get(&self, id: &str) -> RepoResult<Bookmark> {
        let conn = self.conn()?;
        let sql = format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = ?1;");
        match conn.query_row(&sql, [id], map_row) {
            Ok(bookmark) => Ok(bookmark),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepoError::NotFound(id.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self, query: &BookmarkQuery) -> RepoResult<Vec<Bookmark>> {
        let mut sql = format!(
            "SELECT {BOOKMARK_COLUMNS}
             FROM bookmarks
             WHERE user_id = ?
               AND is_archived = ?
             ORDER BY created_at DESC, id DESC"
        );
        let mut bind_values = vec![
            Value::Text(query.user_id.clone()),
            Value::Integer(i64::from(query.archived)),
        ];

        if let Some((offset, limit)) = query.window() {
            sql.push_str(" LIMIT ? OFFSET ?");
            bind_values.push(Value::Integer(limit as i64));
            bind_values.push(Value::Integer(offset as i64));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), map_row)?;
        let bookmarks = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bookmarks)
    }

    fn count(&self, query: &BookmarkQuery) -> RepoResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bookmarks WHERE user_id = ?1 AND is_archived = ?2;",
            params![query.user_id, query.archived],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Updates the mutable columns in place and returns the stored row.
    /// `is_archived` only moves from 0 to 1.
    fn update(&self, bookmark: Bookmark) -> RepoResult<Bookmark> {
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE bookmarks
             SET
                url = ?2,
                title = ?3,
                main_image_url = ?4,
                content_summary = ?5,
                is_archived = MAX(is_archived, ?6),
                updated_at = ?7
             WHERE id = ?1
             RETURNING {BOOKMARK_COLUMNS};"
        );
        let result = conn.query_row(
            &sql,
            params![
                bookmark.id,
                bookmark.url,
                bookmark.title,
                bookmark.main_image_url,
                bookmark.content_summary,
                bookmark.is_archived,
                to_micros(model::now()),
            ],
            map_row,
        );

        match result {
            Ok(updated) => {
                debug!(id = %updated.id, "sqlite: updated bookmark");
                Ok(updated)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepoError::NotFound(bookmark.id)),
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM bookmarks WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        debug!(id, "sqlite: deleted bookmark");
        Ok(())
    }
}
