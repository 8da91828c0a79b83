//! Athena bookmark engine
//!
//! Bookmarks are enriched with fetched page metadata on creation, stored in
//! one of three interchangeable backends, and listed newest first with
//! pagination. The HTTP modules expose this over a small JSON API.

pub mod config;
pub mod database;
pub mod error;
pub mod fetcher;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod pagination;
pub mod repository;
pub mod route;
pub mod service;

pub use error::{ErrorKind, FetchError, FetchStage, RepoError, ServiceError, StorageError};
pub use model::{Bookmark, BookmarkQuery, CreateBookmark, PaginatedResult};
pub use repository::BookmarkRepository;
pub use service::BookmarkService;
