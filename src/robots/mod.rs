//! Robots.txt handling module
//!
//! This module provides fetching, parsing and per-run caching of robots.txt
//! policies.

mod cache;
mod parser;

pub use cache::PolitenessCache;
pub use parser::RobotsPolicy;
