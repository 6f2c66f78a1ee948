//! Configuration module for Sumi-Seek
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_seek::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ChunkingConfig, Config, CrawlerConfig, EmbeddingConfig, FusionPolicy, IndexConfig, LlmConfig,
    SearchConfig, ServerConfig, StorageConfig, UserAgentConfig,
};

// Re-export validation entry points
pub use validation::{require_embedding_key, validate};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
    EMBEDDING_API_KEY_ENV, LLM_API_KEY_ENV,
};
