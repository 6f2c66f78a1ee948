use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable consulted for the embedding provider key
pub const EMBEDDING_API_KEY_ENV: &str = "EMBEDDING_API_KEY";

/// Environment variable consulted for the language model key
pub const LLM_API_KEY_ENV: &str = "LLM_API_KEY";

/// Loads and parses a configuration file from the given path
///
/// API keys found in the environment override the ones in the file.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_seek::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Rate limit: {}", config.crawler.rate_limit);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration text, applies environment overrides and validates
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Fills API keys from `EMBEDDING_API_KEY` and `LLM_API_KEY` when set
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_with(config, |key| std::env::var(key).ok());
}

fn apply_overrides_with(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup(EMBEDDING_API_KEY_ENV).filter(|k| !k.is_empty()) {
        config.embedding.api_key = Some(key);
    }
    if let Some(key) = lookup(LLM_API_KEY_ENV).filter(|k| !k.is_empty()) {
        config.llm.api_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FusionPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
max-depth = 3
max-workers = 8
rate-limit = 2.5
respect-robots = false

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "2.0"
contact-email = "admin@example.com"

[storage]
database-path = "./test.db"

[search]
vector-weight = 0.5
lexical-weight = 0.5
fusion = "linear"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.max_workers, 8);
        assert!(!config.crawler.respect_robots);
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
        assert_eq!(config.storage.database_path, "./test.db");
        assert_eq!(config.search.fusion, FusionPolicy::Linear);
        // Untouched sections keep their defaults
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.embedding.batch_size, 10);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.crawler.max_workers, 5);
        assert_eq!(config.crawler.max_page_size, 1024 * 1024);
        assert_eq!(config.search.vector_weight, 0.7);
        assert_eq!(config.search.lexical_weight, 0.3);
        assert_eq!(config.search.fusion, FusionPolicy::Sequential);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawler]\nmax-workers = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_env_overrides_api_keys() {
        let mut config = Config::default();
        config.embedding.api_key = Some("from-file".to_string());

        apply_overrides_with(&mut config, |key| match key {
            EMBEDDING_API_KEY_ENV => Some("from-env".to_string()),
            LLM_API_KEY_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.embedding.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
