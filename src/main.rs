//! Sumi-Seek main entry point
//!
//! This is the command-line interface for crawling, indexing and searching.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sumi_seek::config::{
    apply_env_overrides, load_config_with_hash, require_embedding_key, validate, Config,
};
use sumi_seek::crawler::Crawler;
use sumi_seek::embedding::{EmbeddingProvider, OpenAiEmbedder};
use sumi_seek::index::{IndexPipeline, TextChunker};
use sumi_seek::llm::OpenRouterModel;
use sumi_seek::output::print_summary;
use sumi_seek::search::{ChromaIndex, ElasticIndex, HybridSearcher, LlmReranker, Retriever};
use sumi_seek::storage::open_storage;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Seek: a polite crawler feeding a hybrid search index
///
/// Sumi-Seek crawls websites while respecting robots.txt and per-domain
/// rate limits, indexes what it finds in a vector and a keyword backend,
/// and answers queries from the command line or over HTTP.
#[derive(Parser, Debug)]
#[command(name = "sumi-seek")]
#[command(version)]
#[command(about = "A polite crawler feeding a hybrid search index", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl from a URL and index every page found
    Crawl {
        /// Starting URL
        #[arg(short, long)]
        url: String,

        /// Maximum link depth (overrides the config file)
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Serve the search API over HTTP
    Server {
        /// Address to bind (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one query and print the results
    Search {
        /// Query text
        query: String,

        /// Number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    match cli.command {
        Command::Crawl { url, depth } => handle_crawl(config, &url, depth).await,
        Command::Server { host, port } => handle_server(config, host, port).await,
        Command::Search { query, limit } => handle_search(config, &query, limit).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_seek=info,warn"),
            1 => EnvFilter::new("sumi_seek=debug,info"),
            2 => EnvFilter::new("sumi_seek=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file, or defaults plus environment overrides
fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            let mut config = Config::default();
            apply_env_overrides(&mut config);
            validate(&config)?;
            tracing::debug!("Using default configuration");
            Ok(config)
        }
    }
}

fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let key = require_embedding_key(config)?;
    Ok(Arc::new(OpenAiEmbedder::new(&config.embedding, key)?))
}

fn build_retriever(config: &Config) -> Result<Retriever> {
    let searcher = HybridSearcher::new(
        build_embedder(config)?,
        Arc::new(ChromaIndex::new(&config.index)?),
        Arc::new(ElasticIndex::new(&config.index)?),
        &config.search,
    );
    let mut retriever = Retriever::new(searcher);

    if config.llm.enable_reranking {
        let key = config.llm.api_key.as_deref().unwrap_or_default();
        let model = OpenRouterModel::new(&config.llm, key)?;
        retriever = retriever.with_reranker(
            Arc::new(LlmReranker::new(Arc::new(model))),
            Duration::from_secs(config.search.rerank_timeout_secs),
        );
        tracing::info!("LLM reranking enabled ({})", config.llm.model);
    }

    Ok(retriever)
}

/// Handles the crawl command: crawl, index and print the summary
async fn handle_crawl(config: Config, url: &str, depth: Option<u32>) -> Result<()> {
    let embedder = build_embedder(&config)?;
    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("failed to open {}", config.storage.database_path))?;

    let mut pipeline = IndexPipeline::new(
        Box::new(storage),
        embedder,
        Arc::new(ChromaIndex::new(&config.index)?),
        Arc::new(ElasticIndex::new(&config.index)?),
        TextChunker::new(&config.chunking),
    );

    let max_depth = depth.unwrap_or(config.crawler.max_depth);
    let crawler = Crawler::new(config.crawler.clone(), config.user_agent.clone())?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping crawl");
            ctrl_c.cancel();
        }
    });

    let handle = crawler.crawl(url, max_depth, cancel)?;
    let summary = pipeline.run(handle).await;

    print_summary(&summary);
    Ok(())
}

/// Handles the server command
async fn handle_server(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let retriever = build_retriever(&config)?;
    sumi_seek::server::serve(&config.server, retriever)
        .await
        .context("server failed")
}

/// Handles the search command
async fn handle_search(config: Config, query: &str, limit: usize) -> Result<()> {
    let retriever = build_retriever(&config)?;
    let results = retriever.retrieve(query, limit).await?;

    if results.is_empty() {
        println!("No results for \"{}\"", query);
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let title = result
            .metadata
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("(untitled)");
        let url = result
            .metadata
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        println!("{}. {} [{:.3}]", i + 1, title, result.score);
        if !url.is_empty() {
            println!("   {}", url);
        }
        println!("   {}\n", truncate(&result.text, 200));
    }

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
