//! Error types for the bookmark engine
//!
//! Each layer wraps the errors of the layer below with the operation and key
//! (id or URL) it was working on. `ServiceError::kind` recovers the category
//! through any amount of wrapping.

use std::fmt;

use thiserror::Error;

/// Backend I/O failure, independent of which storage technology raised it
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("redb: {0}")]
    Redb(#[from] redb::Error),

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("lock poisoned")]
    LockPoisoned,

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<redb::TransactionError> for StorageError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Redb(value.into())
    }
}

impl From<redb::TableError> for StorageError {
    fn from(value: redb::TableError) -> Self {
        Self::Redb(value.into())
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(value: redb::StorageError) -> Self {
        Self::Redb(value.into())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(value: redb::CommitError) -> Self {
        Self::Redb(value.into())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Redb(value.into())
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by every `BookmarkRepository` implementation
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("bookmark not found: {0}")]
    NotFound(String),

    #[error("bookmark already exists: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.into())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::TransactionError> for RepoError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::TableError> for RepoError {
    fn from(value: redb::TableError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::StorageError> for RepoError {
    fn from(value: redb::StorageError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::CommitError> for RepoError {
    fn from(value: redb::CommitError) -> Self {
        Self::Storage(value.into())
    }
}

/// Error returned by a `ContentFetcher`
///
/// Unreachable pages are not errors; fetchers return an empty string for
/// those. These variants cover bad input and unusable internal state only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0:?}")]
    InvalidUrl(String),

    #[error("fetcher unavailable: {0}")]
    Unavailable(String),
}

/// Stage of the enrichment pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Title,
    MainImage,
    ContentSummary,
}

impl FetchStage {
    /// Stages in the order they run during bookmark creation.
    pub const PIPELINE: [FetchStage; 3] = [Self::Title, Self::MainImage, Self::ContentSummary];
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Title => "title",
            Self::MainImage => "main image URL",
            Self::ContentSummary => "content summary",
        };
        f.write_str(label)
    }
}

/// Category of a service failure, stable across wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    EnrichmentFailed,
    Storage,
}

impl ErrorKind {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::EnrichmentFailed => "enrichment_failed",
            Self::Storage => "storage_error",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error returned by `BookmarkService`
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("failed to fetch {stage} for URL {url}: {source}")]
    EnrichmentFailed {
        stage: FetchStage,
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("{context}: {source}")]
    Repository {
        context: String,
        #[source]
        source: RepoError,
    },
}

impl ServiceError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wraps a repository error with the operation and key it concerned.
    pub(crate) fn repo(context: impl Into<String>) -> impl FnOnce(RepoError) -> Self {
        let context = context.into();
        move |source| Self::Repository { context, source }
    }

    /// Category of this error. An enrichment failure caused by a URL the
    /// fetcher rejected as unusable is `InvalidArgument`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::EnrichmentFailed {
                source: FetchError::InvalidUrl(_),
                ..
            } => ErrorKind::InvalidArgument,
            Self::EnrichmentFailed { .. } => ErrorKind::EnrichmentFailed,
            Self::Repository { source, .. } => match source {
                RepoError::NotFound(_) => ErrorKind::NotFound,
                RepoError::Conflict(_) => ErrorKind::Conflict,
                RepoError::Storage(_) => ErrorKind::Storage,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
