//! Crawl-to-index pipeline
//!
//! Consumes the page and error streams of a running crawl. Every page is
//! stored, chunked, embedded and written to both search backends. A page that
//! fails at any step is logged and skipped; the crawl keeps going.

use crate::crawler::{CrawlHandle, Page};
use crate::embedding::EmbeddingProvider;
use crate::index::TextChunker;
use crate::search::{LexicalIndex, VectorIndex};
use crate::state::CrawlStats;
use crate::storage::{Document, Storage};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;

/// Outcome of one crawl-and-index run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Pages received from the crawler
    pub pages_processed: u64,

    /// Pages written to both search backends
    pub pages_indexed: u64,

    pub chunks_indexed: u64,

    /// Targets reported on the crawl error stream
    pub errors: u64,

    pub crawl: CrawlStats,
}

pub struct IndexPipeline {
    storage: Box<dyn Storage + Send>,
    embedder: Arc<dyn EmbeddingProvider>,
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    chunker: TextChunker,
}

impl IndexPipeline {
    pub fn new(
        storage: Box<dyn Storage + Send>,
        embedder: Arc<dyn EmbeddingProvider>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
        chunker: TextChunker,
    ) -> Self {
        Self {
            storage,
            embedder,
            vector,
            lexical,
            chunker,
        }
    }

    /// Drains both streams of `handle` until the crawl is over
    pub async fn run(&mut self, handle: CrawlHandle) -> IndexSummary {
        let CrawlHandle {
            mut pages,
            mut errors,
            completion,
            ..
        } = handle;

        let mut summary = IndexSummary::default();
        let mut pages_open = true;
        let mut errors_open = true;

        while pages_open || errors_open {
            tokio::select! {
                page = pages.recv(), if pages_open => match page {
                    Some(page) => {
                        summary.pages_processed += 1;
                        tracing::info!("Processing page {}: {}", summary.pages_processed, page.url);

                        match self.index_page(&page).await {
                            Ok(0) => tracing::info!("No chunks created for {}", page.url),
                            Ok(chunks) => {
                                summary.pages_indexed += 1;
                                summary.chunks_indexed += chunks as u64;
                                tracing::info!("Indexed {} chunks for {}", chunks, page.url);
                            }
                            Err(e) => tracing::warn!("Failed to index {}: {}", page.url, e),
                        }
                    }
                    None => pages_open = false,
                },
                error = errors.recv(), if errors_open => match error {
                    Some(error) => {
                        summary.errors += 1;
                        tracing::debug!("Crawl error: {}", error);
                    }
                    None => errors_open = false,
                },
            }
        }

        summary.crawl = match completion.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("Crawl supervisor failed: {}", e);
                CrawlStats::default()
            }
        };

        summary
    }

    /// Stores and indexes one page, returning the number of chunks written
    pub async fn index_page(&mut self, page: &Page) -> Result<usize> {
        let now = Utc::now();
        let document = Document {
            id: page.content_hash.clone(),
            url: page.url.to_string(),
            title: page.title.clone(),
            content: page.text.clone(),
            meta_description: page.meta_description.clone(),
            content_hash: page.content_hash.clone(),
            depth: page.depth,
            created_at: now,
            updated_at: now,
        };

        self.storage.save_document(&document)?;

        let chunks = self.chunker.chunk_document(&document);
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        self.storage.save_chunks(&document.id, &chunks)?;
        self.vector.add(&chunks, &embeddings).await?;
        self.lexical.index(&chunks).await?;

        Ok(chunks.len())
    }
}
