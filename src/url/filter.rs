use thiserror::Error;
use url::Url;

/// File extensions that never lead to an HTML page worth indexing
const BLOCKED_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".tar", ".gz",
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico", ".css", ".js", ".xml", ".json",
];

/// Path prefixes for admin areas, auth flows, APIs and static assets
const BLOCKED_PATH_PREFIXES: &[&str] = &[
    "/admin", "/login", "/logout", "/api/", "/static/", "/assets/", "/images/", "/css/", "/js/",
];

/// Why a URL was excluded from the crawl
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterReason {
    #[error("unsupported scheme '{0}'")]
    Scheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("blocked file extension '{0}'")]
    Extension(&'static str),

    #[error("blocked path prefix '{0}'")]
    PathPrefix(&'static str),

    #[error("blocked query parameter '{0}'")]
    Query(&'static str),
}

/// Checks whether a URL may be crawled
///
/// A URL passes when it is http(s) with a host, its path does not end in a
/// binary or asset extension, its path does not start with an admin, auth,
/// API or asset prefix, and its query does not request a download.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_seek::url::check_crawlable;
///
/// assert!(check_crawlable(&Url::parse("https://example.com/guide").unwrap()).is_ok());
/// assert!(check_crawlable(&Url::parse("https://example.com/report.pdf").unwrap()).is_err());
/// ```
pub fn check_crawlable(url: &Url) -> Result<(), FilterReason> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FilterReason::Scheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(FilterReason::MissingHost);
    }

    let path = url.path().to_lowercase();

    if let Some(ext) = BLOCKED_EXTENSIONS.iter().find(|ext| path.ends_with(*ext)) {
        return Err(FilterReason::Extension(ext));
    }

    if let Some(prefix) = BLOCKED_PATH_PREFIXES
        .iter()
        .find(|prefix| path.starts_with(*prefix))
    {
        return Err(FilterReason::PathPrefix(prefix));
    }

    // Only the first occurrence of a key counts
    let first_value = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };

    if first_value("download").is_some_and(|v| !v.is_empty()) {
        return Err(FilterReason::Query("download"));
    }
    if first_value("attachment").is_some_and(|v| !v.is_empty()) {
        return Err(FilterReason::Query("attachment"));
    }
    if first_value("format").as_deref() == Some("pdf") {
        return Err(FilterReason::Query("format"));
    }

    Ok(())
}

/// Boolean form of [`check_crawlable`]
pub fn is_crawlable(url: &Url) -> bool {
    check_crawlable(url).is_ok()
}
