//! Crawler module for web page fetching and processing
//!
//! This module contains the concurrent crawl engine:
//! - HTTP fetching with size caps and content checks
//! - HTML text and link extraction
//! - Per-domain rate limiting
//! - The bounded frontier and visited set
//! - Worker pool orchestration

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod rate_limiter;

pub use coordinator::{CrawlControl, CrawlError, CrawlHandle, Crawler};
pub use fetcher::{build_http_client, FetchError, Fetcher, Page};
pub use frontier::{CrawlTarget, Frontier, VisitedSet};
pub use parser::{content_hash, HtmlExtractor, ParsedPage, TextExtractor};
pub use rate_limiter::{interval_for, RateLimiter, ACQUIRE_TIMEOUT};
