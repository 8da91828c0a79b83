//! Document-store backend on the embedded redb database
//!
//! Bookmarks are stored as JSON documents keyed by id in `TABLE_BOOKMARKS`.
//! A secondary index in `TABLE_USER_INDEX` keeps one entry per bookmark under
//! the tuple key `(user_id, archived, created_at, id)`, so a reversed range
//! scan over one `(user_id, archived)` pair yields bookmarks newest first
//! without reading unrelated documents. Ties on `created_at` come out in
//! descending id order, the same as the other backends.

use std::ops::RangeInclusive;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::database::{UserIndexKey, TABLE_BOOKMARKS, TABLE_USER_INDEX};
use crate::error::{RepoError, RepoResult, StorageError};
use crate::model::{self, Bookmark, BookmarkQuery};
use crate::repository::BookmarkRepository;

/// redb-backed bookmark repository.
#[derive(Clone)]
pub struct DocumentBookmarkRepository {
    db: Arc<Database>,
}

impl DocumentBookmarkRepository {
    /// Wraps a database whose tables were created by `database::init_db`.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

fn index_key(bookmark: &Bookmark) -> UserIndexKey<'_> {
    (
        bookmark.user_id.as_str(),
        bookmark.is_archived,
        bookmark.created_at.timestamp_micros(),
        bookmark.id.as_str(),
    )
}

/// Every index entry of one `(user_id, archived)` pair.
///
/// `chrono` cannot represent `i64::MAX` microseconds, so no stored key sorts
/// after the upper bound.
fn user_range(query: &BookmarkQuery) -> RangeInclusive<UserIndexKey<'_>> {
    let user_id = query.user_id.as_str();
    (user_id, query.archived, i64::MIN, "")..=(user_id, query.archived, i64::MAX, "")
}

impl BookmarkRepository for DocumentBookmarkRepository {
    /// # Database Operations
    ///
    /// Writes to two tables in one transaction:
    /// 1. `TABLE_BOOKMARKS` - The JSON document, keyed by id
    /// 2. `TABLE_USER_INDEX` - The `(user_id, archived, created_at, id)` entry
    fn create(&self, mut bookmark: Bookmark) -> RepoResult<Bookmark> {
        bookmark.stamp_for_create(model::now());

        let write_txn = self.db.begin_write()?;
        {
            let mut table_main = write_txn.open_table(TABLE_BOOKMARKS)?;

            if bookmark.id.is_empty() {
                let mut id = model::generate_id();
                while table_main.get(id.as_str())?.is_some() {
                    id = model::generate_id();
                }
                bookmark.id = id;
            } else if table_main.get(bookmark.id.as_str())?.is_some() {
                return Err(RepoError::Conflict(bookmark.id));
            }

            let document = serde_json::to_string(&bookmark)?;
            table_main.insert(bookmark.id.as_str(), document.as_str())?;

            let mut table_index = write_txn.open_table(TABLE_USER_INDEX)?;
            table_index.insert(index_key(&bookmark), bookmark.id.as_str())?;
        }
        write_txn.commit()?;

        debug!(id = %bookmark.id, user_id = %bookmark.user_id, "redb: created bookmark");
        Ok(bookmark)
    }

    fn get(&self, id: &str) -> RepoResult<Bookmark> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_BOOKMARKS)?;

        match table.get(id)? {
            Some(document) => Ok(serde_json::from_str(document.value())?),
            None => Err(RepoError::NotFound(id.to_string())),
        }
    }

    fn list(&self, query: &BookmarkQuery) -> RepoResult<Vec<Bookmark>> {
        let (offset, limit) = query.window().unwrap_or((0, usize::MAX));

        let read_txn = self.db.begin_read()?;
        let table_index = read_txn.open_table(TABLE_USER_INDEX)?;
        let table_main = read_txn.open_table(TABLE_BOOKMARKS)?;

        let mut bookmarks = Vec::new();
        for entry in table_index
            .range(user_range(query))?
            .rev()
            .skip(offset)
            .take(limit)
        {
            let (_, id) = entry?;
            let document = table_main.get(id.value())?.ok_or_else(|| {
                StorageError::Corrupt(format!(
                    "index points at missing bookmark {}",
                    id.value()
                ))
            })?;
            bookmarks.push(serde_json::from_str(document.value())?);
        }
        Ok(bookmarks)
    }

    fn count(&self, query: &BookmarkQuery) -> RepoResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table_index = read_txn.open_table(TABLE_USER_INDEX)?;

        let mut count = 0u64;
        for entry in table_index.range(user_range(query))? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// # Database Operations
    ///
    /// Rewrites the document and moves its index entry, since archiving
    /// changes the key.
    fn update(&self, bookmark: Bookmark) -> RepoResult<Bookmark> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table_main = write_txn.open_table(TABLE_BOOKMARKS)?;
            let stored: Bookmark = match table_main.get(bookmark.id.as_str())? {
                Some(document) => serde_json::from_str(document.value())?,
                None => return Err(RepoError::NotFound(bookmark.id.clone())),
            };
            let updated = bookmark.merged_onto(&stored, model::now());

            let document = serde_json::to_string(&updated)?;
            table_main.insert(updated.id.as_str(), document.as_str())?;

            // Drop the old index entry before inserting the new one
            let mut table_index = write_txn.open_table(TABLE_USER_INDEX)?;
            table_index.remove(index_key(&stored))?;
            table_index.insert(index_key(&updated), updated.id.as_str())?;
            updated
        };
        write_txn.commit()?;

        debug!(id = %updated.id, "redb: updated bookmark");
        Ok(updated)
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table_main = write_txn.open_table(TABLE_BOOKMARKS)?;
            let removed = table_main
                .remove(id)?
                .map(|document| document.value().to_string());
            let stored: Bookmark = match removed {
                Some(document) => serde_json::from_str(&document)?,
                None => return Err(RepoError::NotFound(id.to_string())),
            };

            let mut table_index = write_txn.open_table(TABLE_USER_INDEX)?;
            table_index.remove(index_key(&stored))?;
        }
        write_txn.commit()?;

        debug!(id, "redb: deleted bookmark");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn in_range(query: &BookmarkQuery, bookmark: &Bookmark) -> bool {
        user_range(query).contains(&index_key(bookmark))
    }

    #[test]
    fn user_range_matches_user_and_flag_exactly() {
        let query = BookmarkQuery::new("ann", false);

        let mut own = Bookmark::draft("ann", "https://a.test");
        own.id = "x".into();
        own.created_at = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();
        let mut other = Bookmark::draft("anne", "https://a.test");
        other.id = "y".into();
        let mut archived = own.clone();
        archived.is_archived = true;
        let mut separator = Bookmark::draft("ann\u{1f}0", "https://a.test");
        separator.id = "z".into();

        assert!(in_range(&query, &own));
        assert!(!in_range(&query, &other));
        assert!(!in_range(&query, &archived));
        assert!(!in_range(&query, &separator));
    }
}
