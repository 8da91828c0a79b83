//! Shared test fixtures: a scripted content fetcher and backend builders.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use athena::database::{init_db, open_sqlite_in_memory};
use athena::error::{FetchError, FetchStage, RepoError, RepoResult, StorageError};
use athena::fetcher::ContentFetcher;
use athena::model::{Bookmark, BookmarkQuery};
use athena::repository::{
    BookmarkRepository, DocumentBookmarkRepository, InMemoryBookmarkRepository,
    SqliteBookmarkRepository,
};

/// Fetcher returning fixed values and recording which stages ran.
#[derive(Default)]
pub struct StubFetcher {
    pub title: String,
    pub main_image_url: String,
    pub content_summary: String,
    pub fail_at: Option<FetchStage>,
    pub reject_url: bool,
    calls: Mutex<Vec<FetchStage>>,
}

impl StubFetcher {
    pub fn returning(title: &str, main_image_url: &str, content_summary: &str) -> Self {
        Self {
            title: title.to_string(),
            main_image_url: main_image_url.to_string(),
            content_summary: content_summary.to_string(),
            ..Self::default()
        }
    }

    pub fn failing_at(stage: FetchStage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::returning("T", "https://img.test/i.png", "S")
        }
    }

    /// Fails `stage` as if the URL itself were unusable.
    pub fn rejecting_url_at(stage: FetchStage) -> Self {
        Self {
            reject_url: true,
            ..Self::failing_at(stage)
        }
    }

    pub fn calls(&self) -> Vec<FetchStage> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, stage: FetchStage, value: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(stage);
        if self.fail_at == Some(stage) {
            if self.reject_url {
                return Err(FetchError::InvalidUrl(value.to_string()));
            }
            return Err(FetchError::Unavailable(format!("{stage} backend down")));
        }
        Ok(value.to_string())
    }
}

#[async_trait]
impl ContentFetcher for StubFetcher {
    async fn fetch_title(&self, _url: &str) -> Result<String, FetchError> {
        self.answer(FetchStage::Title, &self.title)
    }

    async fn fetch_main_image(&self, _url: &str) -> Result<String, FetchError> {
        self.answer(FetchStage::MainImage, &self.main_image_url)
    }

    async fn fetch_content_summary(&self, _url: &str) -> Result<String, FetchError> {
        self.answer(FetchStage::ContentSummary, &self.content_summary)
    }
}

/// A repository under test; holds on to any temp file backing it.
pub struct Backend {
    pub name: &'static str,
    pub repo: Arc<dyn BookmarkRepository>,
    _file: Option<NamedTempFile>,
}

pub fn memory_backend() -> Backend {
    Backend {
        name: "memory",
        repo: Arc::new(InMemoryBookmarkRepository::new()),
        _file: None,
    }
}

pub fn sqlite_backend() -> Backend {
    let conn = open_sqlite_in_memory().expect("Failed to open sqlite");
    Backend {
        name: "sqlite",
        repo: Arc::new(SqliteBookmarkRepository::new(conn)),
        _file: None,
    }
}

pub fn redb_backend() -> Backend {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path()).expect("Failed to initialize redb");
    Backend {
        name: "redb",
        repo: Arc::new(DocumentBookmarkRepository::new(Arc::new(db))),
        _file: Some(temp_db),
    }
}

pub fn all_backends() -> Vec<Backend> {
    vec![memory_backend(), sqlite_backend(), redb_backend()]
}

/// Repository operation a `FailingRepository` can be told to break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOp {
    Create,
    Get,
    List,
    Count,
    Update,
    Delete,
}

/// In-memory repository that returns a storage error from chosen operations
/// and records every operation it was asked to run.
pub struct FailingRepository {
    inner: InMemoryBookmarkRepository,
    fail_on: Vec<RepoOp>,
    calls: Mutex<Vec<RepoOp>>,
}

impl FailingRepository {
    pub fn failing_on(fail_on: &[RepoOp]) -> Self {
        Self {
            inner: InMemoryBookmarkRepository::new(),
            fail_on: fail_on.to_vec(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped repository, for seeding data past the failure points.
    pub fn inner(&self) -> &InMemoryBookmarkRepository {
        &self.inner
    }

    pub fn calls(&self) -> Vec<RepoOp> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, op: RepoOp) -> RepoResult<()> {
        self.calls.lock().unwrap().push(op);
        if self.fail_on.contains(&op) {
            return Err(RepoError::Storage(StorageError::Corrupt(format!(
                "{op:?} disk unavailable"
            ))));
        }
        Ok(())
    }
}

impl BookmarkRepository for FailingRepository {
    fn create(&self, bookmark: Bookmark) -> RepoResult<Bookmark> {
        self.check(RepoOp::Create)?;
        self.inner.create(bookmark)
    }

    fn get(&self, id: &str) -> RepoResult<Bookmark> {
        self.check(RepoOp::Get)?;
        self.inner.get(id)
    }

    fn list(&self, query: &BookmarkQuery) -> RepoResult<Vec<Bookmark>> {
        self.check(RepoOp::List)?;
        self.inner.list(query)
    }

    fn count(&self, query: &BookmarkQuery) -> RepoResult<u64> {
        self.check(RepoOp::Count)?;
        self.inner.count(query)
    }

    fn update(&self, bookmark: Bookmark) -> RepoResult<Bookmark> {
        self.check(RepoOp::Update)?;
        self.inner.update(bookmark)
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        self.check(RepoOp::Delete)?;
        self.inner.delete(id)
    }
}
