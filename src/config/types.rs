use serde::Deserialize;

/// Main configuration structure for Sumi-Seek
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// usable configuration apart from the API keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Default link depth followed from the seed URL
    pub max_depth: u32,

    /// Number of worker tasks per crawl
    pub max_workers: usize,

    /// Requests per second allowed per domain; zero or less disables limiting
    pub rate_limit: f64,

    /// Maximum number of body bytes read per page
    pub max_page_size: usize,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Timeout for robots.txt fetches (seconds)
    pub robots_timeout_secs: u64,

    /// Whether robots.txt is consulted before fetching
    pub respect_robots: bool,

    /// Whether a robots.txt Crawl-delay raises the per-domain request interval
    pub honor_crawl_delay: bool,

    /// Whether http links are upgraded to https during normalization
    pub force_https: bool,

    /// Overall wall-clock deadline for one crawl (seconds)
    pub crawl_timeout_secs: u64,

    /// Capacity of the pending-target queue
    pub frontier_capacity: usize,

    /// Capacity of the page and error output streams
    pub output_buffer: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_workers: 5,
            rate_limit: 0.1,
            max_page_size: 1024 * 1024,
            timeout_secs: 30,
            robots_timeout_secs: 10,
            respect_robots: true,
            honor_crawl_delay: false,
            force_https: true,
            crawl_timeout_secs: 600,
            frontier_capacity: 1000,
            output_buffer: 100,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler, also the token matched against robots.txt groups
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "sumi-seek".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version (+ContactURL; ContactEmail)`, with the comment
    /// omitted when no contact details are configured.
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = self
            .contact_url
            .iter()
            .map(|url| format!("+{}", url))
            .chain(self.contact_email.iter().cloned())
            .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

/// Relational storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./sumi-seek.db".to_string(),
        }
    }
}

/// Text chunking configuration (sizes in bytes)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap_size: usize,
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap_size: 200,
            min_chunk_size: 100,
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EmbeddingConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            dimensions: 1536,
            batch_size: 10,
            timeout_secs: 30,
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,

    /// Whether search results are handed to the model for background reranking
    pub enable_reranking: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-3.5-turbo".to_string(),
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 30,
            enable_reranking: false,
        }
    }
}

/// Index backend locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexConfig {
    /// Chroma server base URL
    pub chroma_url: String,

    /// Elasticsearch base URL
    pub elastic_url: String,

    /// Chroma collection and Elasticsearch index name
    pub collection: String,

    /// Per-request timeout for both backends (seconds)
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chroma_url: "http://localhost:8000".to_string(),
            elastic_url: "http://localhost:9200".to_string(),
            collection: "documents".to_string(),
            timeout_secs: 30,
        }
    }
}

/// How vector and lexical scores are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FusionPolicy {
    /// Vector pass then lexical pass; a repeat sighting re-weights the stored score
    #[default]
    Sequential,

    /// `vector * vector_weight + lexical * lexical_weight`
    Linear,
}

/// Hybrid search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    pub vector_weight: f32,
    pub lexical_weight: f32,
    pub fusion: FusionPolicy,

    /// Budget for one background rerank (seconds)
    pub rerank_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            lexical_weight: 0.3,
            fusion: FusionPolicy::Sequential,
            rerank_timeout_secs: 30,
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
