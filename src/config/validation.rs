use crate::config::types::{
    ChunkingConfig, Config, CrawlerConfig, EmbeddingConfig, IndexConfig, LlmConfig, SearchConfig,
    ServerConfig, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_chunking_config(&config.chunking)?;
    validate_embedding_config(&config.embedding)?;
    validate_llm_config(&config.llm)?;
    validate_index_config(&config.index)?;
    validate_search_config(&config.search)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Returns the embedding API key, which a crawl cannot run without
pub fn require_embedding_key(config: &Config) -> Result<&str, ConfigError> {
    config
        .embedding
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or(ConfigError::MissingApiKey("embedding provider"))
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if !config.rate_limit.is_finite() {
        return Err(ConfigError::Validation(format!(
            "rate_limit must be a finite number, got {}",
            config.rate_limit
        )));
    }

    if config.max_page_size == 0 {
        return Err(ConfigError::Validation(
            "max_page_size must be greater than zero".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.robots_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs and robots_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.crawl_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawl_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.frontier_capacity == 0 || config.output_buffer == 0 {
        return Err(ConfigError::Validation(
            "frontier_capacity and output_buffer must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates chunk sizing; overlap must leave room for new text in every chunk
fn validate_chunking_config(config: &ChunkingConfig) -> Result<(), ConfigError> {
    if config.chunk_size == 0 {
        return Err(ConfigError::Validation(
            "chunk_size must be greater than zero".to_string(),
        ));
    }

    if config.overlap_size >= config.chunk_size {
        return Err(ConfigError::Validation(format!(
            "overlap_size ({}) must be smaller than chunk_size ({})",
            config.overlap_size, config.chunk_size
        )));
    }

    if config.min_chunk_size > config.chunk_size {
        return Err(ConfigError::Validation(format!(
            "min_chunk_size ({}) cannot exceed chunk_size ({})",
            config.min_chunk_size, config.chunk_size
        )));
    }

    Ok(())
}

fn validate_embedding_config(config: &EmbeddingConfig) -> Result<(), ConfigError> {
    validate_service_url("embedding base_url", &config.base_url)?;

    if config.model.is_empty() {
        return Err(ConfigError::Validation(
            "embedding model cannot be empty".to_string(),
        ));
    }

    if config.batch_size == 0 || config.dimensions == 0 {
        return Err(ConfigError::Validation(
            "embedding batch_size and dimensions must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm_config(config: &LlmConfig) -> Result<(), ConfigError> {
    validate_service_url("llm base_url", &config.base_url)?;

    if config.model.is_empty() {
        return Err(ConfigError::Validation(
            "llm model cannot be empty".to_string(),
        ));
    }

    if config.enable_reranking && config.api_key.is_none() {
        return Err(ConfigError::MissingApiKey("language model (reranking enabled)"));
    }

    Ok(())
}

fn validate_index_config(config: &IndexConfig) -> Result<(), ConfigError> {
    validate_service_url("chroma_url", &config.chroma_url)?;
    validate_service_url("elastic_url", &config.elastic_url)?;

    if config.collection.is_empty() {
        return Err(ConfigError::Validation(
            "collection cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    for (name, weight) in [
        ("vector_weight", config.vector_weight),
        ("lexical_weight", config.lexical_weight),
    ] {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a non-negative number, got {}",
                name, weight
            )));
        }
    }

    if config.vector_weight + config.lexical_weight == 0.0 {
        return Err(ConfigError::Validation(
            "vector_weight and lexical_weight cannot both be zero".to_string(),
        ));
    }

    if config.rerank_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "rerank_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.host.is_empty() {
        return Err(ConfigError::Validation("server host cannot be empty".to_string()));
    }
    Ok(())
}

/// Checks that a backend URL parses and uses http(s)
fn validate_service_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Must contain a single @ with text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_workers_bounds() {
        let mut config = Config::default();
        config.crawler.max_workers = 0;
        assert!(validate(&config).is_err());

        config.crawler.max_workers = 101;
        assert!(validate(&config).is_err());

        config.crawler.max_workers = 10;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_non_positive_rate_limit_is_allowed() {
        let mut config = Config::default();
        config.crawler.rate_limit = 0.0;
        assert!(validate(&config).is_ok());

        config.crawler.rate_limit = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_chunking() {
        let mut config = Config::default();
        config.chunking.overlap_size = config.chunking.chunk_size;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.chunking.min_chunk_size = config.chunking.chunk_size + 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_search_weights() {
        let mut config = Config::default();
        config.search.vector_weight = -0.1;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.search.vector_weight = 0.0;
        config.search.lexical_weight = 0.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_reranking_requires_llm_key() {
        let mut config = Config::default();
        config.llm.enable_reranking = true;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingApiKey(_))
        ));

        config.llm.api_key = Some("key".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_require_embedding_key() {
        let mut config = Config::default();
        assert!(require_embedding_key(&config).is_err());

        config.embedding.api_key = Some(String::new());
        assert!(require_embedding_key(&config).is_err());

        config.embedding.api_key = Some("sk-test".to_string());
        assert_eq!(require_embedding_key(&config).unwrap(), "sk-test");
    }

    #[test]
    fn test_validate_service_url() {
        assert!(validate_service_url("x", "http://localhost:9200").is_ok());
        assert!(validate_service_url("x", "ftp://localhost").is_err());
        assert!(validate_service_url("x", "not a url").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
