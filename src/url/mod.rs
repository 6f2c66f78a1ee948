//! URL handling module for Sumi-Seek
//!
//! This module provides URL normalization, crawlability filtering and domain
//! extraction. Every URL that enters the frontier has passed through both
//! [`UrlNormalizer::normalize`] and [`check_crawlable`].

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{domain_key, extract_domain};
pub use filter::{check_crawlable, is_crawlable, FilterReason};
pub use normalize::UrlNormalizer;
