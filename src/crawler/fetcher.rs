//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler:
//! - Building the HTTP client with the crawler's user agent
//! - GET requests with a per-request timeout
//! - Status and Content-Type checks
//! - Size-capped body reads
//! - Parsing and link normalization

use crate::config::UserAgentConfig;
use crate::crawler::parser::TextExtractor;
use crate::url::{check_crawlable, UrlNormalizer};
use reqwest::{redirect::Policy, Client};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched and parsed page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub url: Url,
    pub title: String,
    pub text: String,
    pub meta_description: String,

    /// Outbound links, normalized and filtered, without duplicates
    pub links: Vec<Url>,

    /// Hex SHA-256 of `text`
    pub content_hash: String,

    /// Link hops from the seed
    pub depth: u32,
}

/// Why a single URL could not be turned into a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("unsupported content type '{0}'")]
    ContentType(String),

    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("failed to parse page: {0}")]
    Parse(String),
}

impl FetchError {
    fn from_request(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(error)
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Overall per-request timeout
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_seek::config::UserAgentConfig;
/// use sumi_seek::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages and turns them into [`Page`] values
pub struct Fetcher {
    client: Client,
    extractor: Arc<dyn TextExtractor>,
    normalizer: UrlNormalizer,
    max_page_size: usize,
}

impl Fetcher {
    pub fn new(
        client: Client,
        extractor: Arc<dyn TextExtractor>,
        normalizer: UrlNormalizer,
        max_page_size: usize,
    ) -> Self {
        Self {
            client,
            extractor,
            normalizer,
            max_page_size,
        }
    }

    /// Fetches a URL and parses it into a page
    ///
    /// # Request Flow
    ///
    /// 1. GET the URL (redirects followed, at most 10 hops)
    /// 2. Non-2xx status → `FetchError::Status`
    /// 3. Content-Type without `text/html` → `FetchError::ContentType`
    /// 4. Read at most `max_page_size` bytes; the rest is dropped
    /// 5. Extract title, text, description and links
    /// 6. Normalize each link and keep the crawlable ones
    pub async fn fetch_and_parse(&self, url: &Url, depth: u32) -> Result<Page, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.to_lowercase().contains("text/html") {
            return Err(FetchError::ContentType(content_type));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e)
            }
        })? {
            let remaining = self.max_page_size - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let html = String::from_utf8_lossy(&body);
        let parsed = self
            .extractor
            .parse(&html, url)
            .map_err(FetchError::Parse)?;

        let links = self.filter_links(parsed.links);

        Ok(Page {
            url: url.clone(),
            title: parsed.title,
            text: parsed.text,
            meta_description: parsed.meta_description,
            links,
            content_hash: parsed.content_hash,
            depth,
        })
    }

    /// Normalizes raw links, drops uncrawlable ones and duplicates
    fn filter_links(&self, raw: Vec<Url>) -> Vec<Url> {
        let mut seen = HashSet::new();

        raw.into_iter()
            .filter_map(|link| self.normalizer.normalize_url(link).ok())
            .filter(|link| match check_crawlable(link) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::trace!("Dropping link {}: {}", link, reason);
                    false
                }
            })
            .filter(|link| seen.insert(link.as_str().to_string()))
            .collect()
    }
}
