//! Data models for the bookmark engine
//!
//! This module defines the stored `Bookmark` record, the query and pagination
//! descriptors used by the repositories, and the request/response payloads
//! exchanged with the HTTP boundary.

use chrono::{DateTime, SubsecRound, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

/// Length of repository-assigned bookmark ids.
pub const ID_LEN: usize = 16;

/// A saved URL together with the metadata fetched when it was created
///
/// An empty `id` means "not yet assigned" and a `created_at` equal to the
/// Unix epoch means "not yet persisted"; repositories fill both in on
/// `create`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Opaque identifier assigned by the repository
    pub id: String,

    /// Owner of the bookmark, immutable after creation
    pub user_id: String,

    /// The bookmarked address
    pub url: String,

    /// Page title, empty when the fetcher found none
    #[serde(default)]
    pub title: String,

    /// Primary image of the page, empty when the fetcher found none
    #[serde(default)]
    pub main_image_url: String,

    /// Short description of the page content
    #[serde(default)]
    pub content_summary: String,

    /// Set through the archive operation only, never unset
    #[serde(default)]
    pub is_archived: bool,

    /// Set once on first persistence
    pub created_at: DateTime<Utc>,

    /// Refreshed on every successful update
    pub updated_at: DateTime<Utc>,
}

impl Bookmark {
    /// Builds an unsaved bookmark with no id and zero timestamps.
    pub fn draft(user_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            url: url.into(),
            title: String::new(),
            main_image_url: String::new(),
            content_summary: String::new(),
            is_archived: false,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }

    /// True when `created_at` still holds the zero value.
    pub fn has_zero_created_at(&self) -> bool {
        self.created_at == DateTime::<Utc>::default()
    }

    /// Fills in zero timestamps and truncates supplied ones to microseconds.
    /// The id is left to the backend so it can check for collisions.
    pub(crate) fn stamp_for_create(&mut self, now: DateTime<Utc>) {
        if self.has_zero_created_at() {
            self.created_at = now;
        } else {
            self.created_at = self.created_at.trunc_subsecs(6);
        }
        if self.updated_at == DateTime::<Utc>::default() {
            self.updated_at = now;
        } else {
            self.updated_at = self.updated_at.trunc_subsecs(6);
        }
    }

    /// Applies the update rules against the currently stored record:
    /// `id`, `user_id` and `created_at` always come from `stored`, and an
    /// archived bookmark stays archived.
    pub(crate) fn merged_onto(self, stored: &Bookmark, now: DateTime<Utc>) -> Bookmark {
        Bookmark {
            id: stored.id.clone(),
            user_id: stored.user_id.clone(),
            is_archived: stored.is_archived || self.is_archived,
            created_at: stored.created_at,
            updated_at: now,
            ..self
        }
    }
}

/// Current time truncated to microseconds, the precision every backend keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Generates a random alphanumeric bookmark id.
pub fn generate_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Filter and pagination descriptor for listing bookmarks
///
/// `page` is 1-based. A zero `page` or `page_size` means "not set"; the
/// window only applies when both are positive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkQuery {
    /// Exact match on the owning user
    pub user_id: String,

    /// Exact match on the archive flag
    pub archived: bool,

    pub page: u32,

    pub page_size: u32,
}

impl BookmarkQuery {
    /// Query for every bookmark of `user_id` with the given archive flag.
    pub fn new(user_id: impl Into<String>, archived: bool) -> Self {
        Self {
            user_id: user_id.into(),
            archived,
            page: 0,
            page_size: 0,
        }
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Returns `(offset, limit)` when both pagination fields are positive.
    pub fn window(&self) -> Option<(usize, usize)> {
        if self.page > 0 && self.page_size > 0 {
            let limit = self.page_size as usize;
            let offset = (self.page as usize - 1) * limit;
            Some((offset, limit))
        } else {
            None
        }
    }

    /// Applies the pagination window to an already filtered and sorted list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        match self.window() {
            Some((offset, limit)) => items.into_iter().skip(offset).take(limit).collect(),
            None => items,
        }
    }
}

/// Sorts bookmarks newest first. Ties on `created_at` are ordered by id
/// descending, which is the order every backend returns.
pub fn sort_newest_first(bookmarks: &mut [Bookmark]) {
    bookmarks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// A page of bookmarks together with the counts needed to render paging
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaginatedResult {
    /// Items on the requested page
    pub bookmarks: Vec<Bookmark>,

    /// Number of bookmarks matching the filter, ignoring pagination
    pub total_count: u64,

    pub page: u32,

    pub page_size: u32,

    /// Always at least 1, even when nothing matches
    pub total_pages: u32,
}

/// Input to the bookmark creation use-case
///
/// `id` exists only so that callers who try to choose their own id can be
/// rejected; it must be absent or empty.
#[derive(Debug, Clone)]
pub struct CreateBookmark {
    pub id: Option<String>,

    pub user_id: String,

    pub url: String,
}

/// Request payload for creating a bookmark
///
/// # Example
/// ```json
/// {
///   "url": "https://example.com/article"
/// }
/// ```
#[derive(Deserialize, Debug)]
pub struct CreateRequest {
    /// The address to bookmark
    pub url: String,

    /// Must be absent; present only so a caller-chosen id can be rejected
    #[serde(default)]
    pub id: Option<String>,
}

/// Query parameters for listing bookmarks
///
/// # Example
/// Query string: `?archived=false&page=2&page_size=20`
///
/// Without `page` and `page_size` the full list is returned.
#[derive(Deserialize, Debug)]
pub struct ListParams {
    /// List archived (`true`) or active (`false`, default) bookmarks
    #[serde(default)]
    pub archived: bool,

    pub page: Option<i64>,

    pub page_size: Option<i64>,
}
