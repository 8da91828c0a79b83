//! Bookmark lifecycle service
//!
//! Orchestrates creation (enrichment, then persistence), archival, deletion
//! and paginated listing on top of any `BookmarkRepository`.
//!
//! Ownership is not checked here. Callers must verify that the bookmark
//! belongs to the requesting user before calling `archive_bookmark` or
//! `delete_bookmark`; the HTTP handlers do this.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::fetcher::{self, ContentFetcher};
use crate::model::{Bookmark, BookmarkQuery, CreateBookmark, PaginatedResult};
use crate::pagination;
use crate::repository::BookmarkRepository;

#[derive(Clone)]
pub struct BookmarkService {
    repo: Arc<dyn BookmarkRepository>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl BookmarkService {
    pub fn new(repo: Arc<dyn BookmarkRepository>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { repo, fetcher }
    }

    /// Enriches `input.url` with fetched metadata and stores the bookmark
    ///
    /// This operation:
    /// 1. Rejects a caller-supplied id, an empty user id and an empty URL
    /// 2. Fetches title, main image and content summary, in that order
    /// 3. Stops at the first failed fetch; nothing is persisted
    /// 4. Stores the enriched bookmark, letting the repository assign the id
    ///    and `created_at`
    ///
    /// Fetching happens before the repository is touched, so no storage lock
    /// is held across network calls.
    ///
    /// # Arguments
    ///
    /// * `input` - Owner, URL and an id that must be absent or empty
    ///
    /// # Returns
    ///
    /// The bookmark as stored, or:
    /// - `InvalidArgument` for a supplied id, missing user id or URL, or a URL
    ///   the fetcher rejects
    /// - `EnrichmentFailed` naming the stage and URL when a fetch fails
    /// - a storage error wrapped with the URL when persisting fails
    pub async fn create_bookmark(&self, input: CreateBookmark) -> ServiceResult<Bookmark> {
        if input.id.as_deref().is_some_and(|id| !id.is_empty()) {
            return Err(ServiceError::invalid("bookmark id must be empty"));
        }
        if input.user_id.is_empty() {
            return Err(ServiceError::invalid("user id is required"));
        }
        if input.url.is_empty() {
            return Err(ServiceError::invalid("bookmark url is required"));
        }

        // Enrichment runs to completion before anything is written
        let enrichment = fetcher::enrich(self.fetcher.as_ref(), &input.url).await?;

        let mut bookmark = Bookmark::draft(input.user_id, input.url);
        bookmark.title = enrichment.title;
        bookmark.main_image_url = enrichment.main_image_url;
        bookmark.content_summary = enrichment.content_summary;

        let url = bookmark.url.clone();
        let stored = self.repo.create(bookmark).map_err(ServiceError::repo(format!(
            "failed to create bookmark for URL {url}"
        )))?;

        info!(id = %stored.id, user_id = %stored.user_id, url = %stored.url, "bookmark created");
        Ok(stored)
    }

    /// Loads one bookmark by id. The HTTP handlers use it for ownership checks.
    pub fn get_bookmark(&self, id: &str) -> ServiceResult<Bookmark> {
        if id.is_empty() {
            return Err(ServiceError::invalid("id is required"));
        }
        self.repo
            .get(id)
            .map_err(ServiceError::repo(format!("failed to get bookmark {id}")))
    }

    /// Marks a bookmark archived
    ///
    /// This operation:
    /// 1. Loads the current bookmark (`NotFound` if the id is unknown)
    /// 2. Sets `is_archived`
    /// 3. Writes it back; the repository keeps `created_at` and refreshes
    ///    `updated_at`
    ///
    /// Archiving twice is a no-op that succeeds.
    pub fn archive_bookmark(&self, id: &str) -> ServiceResult<Bookmark> {
        if id.is_empty() {
            return Err(ServiceError::invalid("id is required"));
        }
        let mut bookmark = self
            .repo
            .get(id)
            .map_err(ServiceError::repo(format!("failed to get bookmark {id}")))?;

        bookmark.is_archived = true;

        let archived = self
            .repo
            .update(bookmark)
            .map_err(ServiceError::repo(format!("failed to archive bookmark {id}")))?;

        info!(id, "bookmark archived");
        Ok(archived)
    }

    /// Every bookmark of `user_id` with the given archive flag, newest first.
    pub fn get_all_bookmarks(&self, user_id: &str, archived: bool) -> ServiceResult<Vec<Bookmark>> {
        self.repo
            .list(&BookmarkQuery::new(user_id, archived))
            .map_err(ServiceError::repo(format!(
                "failed to list bookmarks for user {user_id}"
            )))
    }

    /// One page of bookmarks plus the counts needed to page through the rest
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner whose bookmarks are listed
    /// * `archived` - List archived (`true`) or active (`false`) bookmarks
    /// * `page` - 1-based page number; values below 1 become 1
    /// * `page_size` - Items per page; values below 1 become 20, values above
    ///   100 become 100
    ///
    /// # Returns
    ///
    /// The page together with `total_count` and `total_pages` (at least 1).
    /// A failure of either the list or the count returns an error and no
    /// envelope. The count is read separately from the page, so on a live
    /// backend the two may disagree briefly.
    pub fn get_bookmarks_with_pagination(
        &self,
        user_id: &str,
        archived: bool,
        page: i64,
        page_size: i64,
    ) -> ServiceResult<PaginatedResult> {
        let page = pagination::normalize_page(page);
        let page_size = pagination::normalize_page_size(page_size);
        let query = BookmarkQuery::new(user_id, archived).with_page(page, page_size);

        let bookmarks = self.repo.list(&query).map_err(ServiceError::repo(format!(
            "failed to list bookmarks for user {user_id}"
        )))?;
        let total_count = self.repo.count(&query).map_err(ServiceError::repo(format!(
            "failed to count bookmarks for user {user_id}"
        )))?;

        debug!(user_id, archived, page, page_size, total_count, "listed bookmark page");
        Ok(PaginatedResult {
            bookmarks,
            total_count,
            page,
            page_size,
            total_pages: pagination::total_pages(total_count, page_size),
        })
    }

    /// Permanently removes a bookmark. `NotFound` if it does not exist.
    pub fn delete_bookmark(&self, id: &str) -> ServiceResult<()> {
        if id.is_empty() {
            return Err(ServiceError::invalid("id is required"));
        }
        self.repo
            .delete(id)
            .map_err(ServiceError::repo(format!("failed to delete bookmark {id}")))?;

        info!(id, "bookmark deleted");
        Ok(())
    }
}
