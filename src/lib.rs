//! Sumi-Seek: a polite crawler feeding a hybrid search index
//!
//! This crate crawls websites while respecting robots.txt and per-domain rate
//! limits, chunks and embeds the pages it finds, indexes them in a vector and a
//! keyword backend, and answers queries by fusing both rankings.

pub mod config;
pub mod crawler;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod output;
pub mod robots;
pub mod search;
pub mod server;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Seek operations
#[derive(Debug, Error)]
pub enum SeekError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{backend} index error: {message}")]
    Index {
        backend: &'static str,
        message: String,
    },

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TargetState,
        to: state::TargetState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Sumi-Seek operations
pub type Result<T> = std::result::Result<T, SeekError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlHandle, Crawler, Page};
pub use search::{HybridSearcher, Retriever, SearchResult};
pub use state::TargetState;
pub use crate::url::{check_crawlable, extract_domain, UrlNormalizer};
