//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TargetState`: lifecycle of a single crawl target
//! - `CrawlCounters` / `CrawlStats`: per-run tallies of target outcomes

mod stats;
mod target_state;

// Re-export main types
pub use stats::{CrawlCounters, CrawlStats};
pub use target_state::TargetState;
