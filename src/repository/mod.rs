//! Bookmark repository contract and its storage backends
//!
//! Every backend gives the same guarantees:
//! - `create` assigns an id when absent and `created_at` when zero.
//! - `get`, `update` and `delete` report `RepoError::NotFound` for unknown ids.
//! - `list` filters on `user_id` + `archived`, orders by `created_at`
//!   descending, then applies the page window when both `page` and
//!   `page_size` are positive. A page past the end is empty, not an error.
//! - `count` ignores the page window.
//! - `update` never changes `id`, `user_id` or `created_at`, never clears
//!   `is_archived`, and refreshes `updated_at`.
//! - Ties on `created_at` are listed in descending id order.

pub mod document;
pub mod memory;
pub mod sqlite;

use crate::error::RepoResult;
use crate::model::{Bookmark, BookmarkQuery};

pub use document::DocumentBookmarkRepository;
pub use memory::InMemoryBookmarkRepository;
pub use sqlite::SqliteBookmarkRepository;

/// Storage contract shared by the in-memory, relational and document backends.
pub trait BookmarkRepository: Send + Sync {
    /// Persists a new bookmark and returns the stored value.
    fn create(&self, bookmark: Bookmark) -> RepoResult<Bookmark>;

    fn get(&self, id: &str) -> RepoResult<Bookmark>;

    /// Lists matching bookmarks, newest first.
    fn list(&self, query: &BookmarkQuery) -> RepoResult<Vec<Bookmark>>;

    /// Counts matching bookmarks, ignoring pagination.
    fn count(&self, query: &BookmarkQuery) -> RepoResult<u64>;

    /// Replaces the mutable fields of an existing bookmark.
    fn update(&self, bookmark: Bookmark) -> RepoResult<Bookmark>;

    fn delete(&self, id: &str) -> RepoResult<()>;
}
