//! HTTP content fetcher
//!
//! Downloads the page with `reqwest` and pulls metadata out of the HTML with
//! a handful of regular expressions. Network errors, non-success statuses,
//! non-HTML bodies and pages declaring a body over the size limit all
//! degrade to empty strings. Bodies without a declared length are read up to
//! the limit and cut there.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client, Url};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetcher::ContentFetcher;

/// Maximum length of a generated content summary, in characters.
pub const SUMMARY_MAX_CHARS: usize = 300;

/// Default cap on how much of a page body is read, in bytes.
pub const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

const USER_AGENT: &str = concat!("athena/", env!("CARGO_PKG_VERSION"));

static META_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid meta regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attr regex")
});
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));
static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").expect("valid paragraph regex"));
static NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid noise regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space regex"));

/// Fetcher that downloads pages over HTTP(S) with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpContentFetcher {
    client: Client,
    max_page_bytes: usize,
}

impl HttpContentFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            max_page_bytes: MAX_PAGE_BYTES,
        })
    }

    /// Overrides how many bytes of a page body are read.
    pub fn with_max_page_bytes(mut self, max_page_bytes: usize) -> Self {
        self.max_page_bytes = max_page_bytes;
        self
    }

    /// Downloads `url`, returning `None` when the page cannot be used.
    async fn fetch_page(&self, url: &str) -> Result<Option<(Url, String)>, FetchError> {
        let parsed = parse_url(url)?;

        let mut response = match self.client.get(parsed.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, error = %err, "page fetch failed");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "page fetch returned error status");
            return Ok(None);
        }

        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("html"))
            .unwrap_or(true);
        if !is_html {
            debug!(%url, "skipping non-HTML page");
            return Ok(None);
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_page_bytes as u64 {
                warn!(%url, declared, limit = self.max_page_bytes, "page too large, skipping");
                return Ok(None);
            }
        }

        let final_url = response.url().clone();
        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let room = self.max_page_bytes - body.len();
                    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                    if body.len() == self.max_page_bytes {
                        debug!(%url, limit = self.max_page_bytes, "page body truncated");
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(%url, error = %err, "page body could not be read");
                    return Ok(None);
                }
            }
        }

        Ok(Some((final_url, String::from_utf8_lossy(&body).into_owned())))
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch_title(&self, url: &str) -> Result<String, FetchError> {
        Ok(self
            .fetch_page(url)
            .await?
            .map(|(_, html)| extract_title(&html))
            .unwrap_or_default())
    }

    async fn fetch_main_image(&self, url: &str) -> Result<String, FetchError> {
        Ok(self
            .fetch_page(url)
            .await?
            .map(|(base, html)| extract_main_image(&html, &base))
            .unwrap_or_default())
    }

    async fn fetch_content_summary(&self, url: &str) -> Result<String, FetchError> {
        Ok(self
            .fetch_page(url)
            .await?
            .map(|(_, html)| extract_summary(&html))
            .unwrap_or_default())
    }
}

/// Accepts absolute http(s) URLs only.
fn parse_url(url: &str) -> Result<Url, FetchError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    match Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(parsed),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

/// Collects `<meta>` tags keyed by their lowercased `property` or `name`.
/// The first occurrence of a key wins.
fn meta_tags(html: &str) -> HashMap<String, String> {
    let mut found = HashMap::new();
    for tag in META_TAG_RE.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for attr in ATTR_RE.captures_iter(tag.as_str()) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match attr[1].to_ascii_lowercase().as_str() {
                "property" | "name" => key = Some(value.to_ascii_lowercase()),
                "content" => content = Some(value.to_string()),
                _ => {}
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            found.entry(key).or_insert(content);
        }
    }
    found
}

fn first_meta(meta: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| meta.get(*key))
        .map(|value| clean_text(value))
        .find(|value| !value.is_empty())
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Strips tags, decodes common entities and collapses whitespace.
fn clean_text(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, " ");
    let decoded = decode_entities(&without_tags);
    SPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}

pub fn extract_title(html: &str) -> String {
    let meta = meta_tags(html);
    first_meta(&meta, &["og:title", "twitter:title"])
        .or_else(|| {
            TITLE_RE
                .captures(html)
                .map(|c| clean_text(&c[1]))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_default()
}

/// Returns the page's preferred image, resolved against `base`.
pub fn extract_main_image(html: &str, base: &Url) -> String {
    let meta = meta_tags(html);
    first_meta(&meta, &["og:image", "og:image:url", "twitter:image"])
        .and_then(|src| base.join(&src).ok())
        .map(|u| u.to_string())
        .unwrap_or_default()
}

pub fn extract_summary(html: &str) -> String {
    let meta = meta_tags(html);
    let summary = first_meta(&meta, &["og:description", "description", "twitter:description"])
        .unwrap_or_else(|| {
            let body = NOISE_RE.replace_all(html, " ");
            let paragraphs: Vec<String> = PARAGRAPH_RE
                .captures_iter(&body)
                .map(|c| clean_text(&c[1]))
                .filter(|p| !p.is_empty())
                .collect();
            paragraphs.join(" ")
        });
    truncate_chars(&summary, SUMMARY_MAX_CHARS)
}
