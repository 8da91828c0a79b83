//! In-memory backend
//!
//! A single `RwLock` guards the whole map: reads share the lock, writes take
//! it exclusively for the full operation, so `create`/`get`/`update`/`delete`
//! are linearizable and `list` sees one consistent snapshot.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{RepoError, RepoResult, StorageError};
use crate::model::{self, Bookmark, BookmarkQuery};
use crate::repository::BookmarkRepository;

#[derive(Debug, Default)]
pub struct InMemoryBookmarkRepository {
    bookmarks: RwLock<HashMap<String, Bookmark>>,
}

impl InMemoryBookmarkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, HashMap<String, Bookmark>>> {
        self.bookmarks
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, HashMap<String, Bookmark>>> {
        self.bookmarks
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}

fn matches(bookmark: &Bookmark, query: &BookmarkQuery) -> bool {
    bookmark.user_id == query.user_id && bookmark.is_archived == query.archived
}

impl BookmarkRepository for InMemoryBookmarkRepository {
    fn create(&self, mut bookmark: Bookmark) -> RepoResult<Bookmark> {
        let mut map = self.write()?;

        if bookmark.id.is_empty() {
            let mut id = model::generate_id();
            while map.contains_key(&id) {
                id = model::generate_id();
            }
            bookmark.id = id;
        } else if map.contains_key(&bookmark.id) {
            return Err(RepoError::Conflict(bookmark.id));
        }
        bookmark.stamp_for_create(model::now());

        map.insert(bookmark.id.clone(), bookmark.clone());
        debug!(id = %bookmark.id, user_id = %bookmark.user_id, "memory: created bookmark");
        Ok(bookmark)
    }

    fn get(&self, id: &str) -> RepoResult<Bookmark> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    fn list(&self, query: &BookmarkQuery) -> RepoResult<Vec<Bookmark>> {
        let mut found: Vec<Bookmark> = self
            .read()?
            .values()
            .filter(|b| matches(b, query))
            .cloned()
            .collect();

        model::sort_newest_first(&mut found);
        Ok(query.slice(found))
    }

    fn count(&self, query: &BookmarkQuery) -> RepoResult<u64> {
        let count = self.read()?.values().filter(|b| matches(b, query)).count();
        Ok(count as u64)
    }

    fn update(&self, bookmark: Bookmark) -> RepoResult<Bookmark> {
        let mut map = self.write()?;

        let stored = map
            .get(&bookmark.id)
            .ok_or_else(|| RepoError::NotFound(bookmark.id.clone()))?;
        let updated = bookmark.merged_onto(stored, model::now());

        map.insert(updated.id.clone(), updated.clone());
        debug!(id = %updated.id, "memory: updated bookmark");
        Ok(updated)
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        match self.write()?.remove(id) {
            Some(_) => {
                debug!(id, "memory: deleted bookmark");
                Ok(())
            }
            None => Err(RepoError::NotFound(id.to_string())),
        }
    }
}
