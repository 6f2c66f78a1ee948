//! HTML text and link extraction
//!
//! This module turns an HTML document into the pieces the index needs:
//! - Page title and meta description
//! - Visible text (script and style contents excluded)
//! - Outbound links resolved against the page URL
//! - A SHA-256 content hash of the visible text

use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// The page title (from the `<title>` tag), empty when absent
    pub title: String,

    /// Visible text fragments joined by single spaces
    pub text: String,

    /// Content of `<meta name="description">`, empty when absent
    pub meta_description: String,

    /// Absolute link targets, not yet normalized or filtered
    pub links: Vec<Url>,

    /// Hex SHA-256 of `text`
    pub content_hash: String,
}

/// Capability to turn a document into text, metadata and links
pub trait TextExtractor: Send + Sync {
    fn parse(&self, html: &str, base_url: &Url) -> Result<ParsedPage, String>;
}

/// [`TextExtractor`] backed by the `scraper` HTML parser
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl TextExtractor for HtmlExtractor {
    /// Parses HTML content and extracts text, metadata and links
    ///
    /// # Link Extraction Rules
    ///
    /// **Include:** `<a href="...">` anywhere in the document
    ///
    /// **Exclude:**
    /// - `<a href="..." download>`
    /// - `javascript:`, `mailto:`, `tel:` links and data URIs
    /// - Fragment-only links (`#section`)
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_seek::crawler::{HtmlExtractor, TextExtractor};
    /// use url::Url;
    ///
    /// let html = r#"<html><head><title>Test</title></head><body><p>Hi</p><a href="/page">Link</a></body></html>"#;
    /// let base_url = Url::parse("https://example.com/").unwrap();
    /// let parsed = HtmlExtractor.parse(html, &base_url).unwrap();
    /// assert_eq!(parsed.title, "Test");
    /// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
    /// ```
    fn parse(&self, html: &str, base_url: &Url) -> Result<ParsedPage, String> {
        let document = Html::parse_document(html);

        let title = extract_title(&document);
        let meta_description = extract_meta_description(&document);
        let text = extract_text(&document);
        let links = extract_links(&document, base_url)?;
        let content_hash = content_hash(&text);

        Ok(ParsedPage {
            title,
            text,
            meta_description,
            links,
            content_hash,
        })
    }
}

/// Hex-encoded SHA-256 of the given text
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn extract_meta_description(document: &Html) -> String {
    let Ok(selector) = Selector::parse(r#"meta[name="description"]"#) else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

/// Collects non-empty text nodes outside `<script>`, `<style>` and `<noscript>`
fn extract_text(document: &Html) -> String {
    let mut parts = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| matches!(element.name(), "script" | "style" | "noscript"))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

fn extract_links(document: &Html, base_url: &Url) -> Result<Vec<Url>, String> {
    let a_selector =
        Selector::parse("a[href]").map_err(|e| format!("invalid link selector: {:?}", e))?;

    let links = document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect();

    Ok(links)
}

/// Resolves a link href to an absolute URL
///
/// Returns None for empty and fragment-only hrefs, script/mail/phone/data
/// schemes, and hrefs that do not resolve.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    base_url.join(href).ok()
}
