//! Content fetching and the enrichment pipeline
//!
//! A `ContentFetcher` turns a URL into best-effort metadata. Fetchers are
//! expected to absorb network and parse failures themselves and return an
//! empty string; an `Err` means the input was unusable or the fetcher itself
//! is broken, and it aborts bookmark creation.

pub mod http;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{FetchError, FetchStage, ServiceError};

pub use http::HttpContentFetcher;

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_title(&self, url: &str) -> Result<String, FetchError>;

    async fn fetch_main_image(&self, url: &str) -> Result<String, FetchError>;

    async fn fetch_content_summary(&self, url: &str) -> Result<String, FetchError>;
}

impl FetchStage {
    /// Runs this stage against `fetcher`.
    pub async fn fetch(self, fetcher: &dyn ContentFetcher, url: &str) -> Result<String, FetchError> {
        match self {
            Self::Title => fetcher.fetch_title(url).await,
            Self::MainImage => fetcher.fetch_main_image(url).await,
            Self::ContentSummary => fetcher.fetch_content_summary(url).await,
        }
    }
}

/// Metadata gathered for a URL before it is persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub title: String,
    pub main_image_url: String,
    pub content_summary: String,
}

/// Runs every stage of `FetchStage::PIPELINE` in order, stopping at the first
/// error. Later stages are never started once one has failed.
pub async fn enrich(fetcher: &dyn ContentFetcher, url: &str) -> Result<Enrichment, ServiceError> {
    let mut fetched: [String; 3] = Default::default();

    for (slot, stage) in fetched.iter_mut().zip(FetchStage::PIPELINE) {
        *slot = stage.fetch(fetcher, url).await.map_err(|source| {
            warn!(%url, %stage, error = %source, "enrichment stage failed");
            ServiceError::EnrichmentFailed {
                stage,
                url: url.to_string(),
                source,
            }
        })?;
    }

    let [title, main_image_url, content_summary] = fetched;
    Ok(Enrichment {
        title,
        main_image_url,
        content_summary,
    })
}
