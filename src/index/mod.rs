//! Indexing of crawled pages
//!
//! This module turns crawled pages into searchable chunks:
//! - Sentence-aware chunking with overlap
//! - Persistence of documents and chunks
//! - Embedding and writes to the vector and lexical indexes

pub mod chunker;
mod pipeline;

pub use chunker::{chunk_id, TextChunker, TextSpan};
pub use pipeline::{IndexPipeline, IndexSummary};
