use crate::UrlError;
use url::Url;

/// Canonicalizes URLs so that equivalent spellings dedupe to one string
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not http(s)
/// 2. Upgrade `http` to `https` (unless disabled for plain-http test servers)
/// 3. Host is lowercased by the parser; default ports are dropped
/// 4. Strip trailing slashes from the path (root `/` is kept)
/// 5. Remove the fragment
/// 6. Sort query parameters by key, keeping the order of repeated keys
/// 7. Remove an empty query string
///
/// Applying `normalize` to its own output returns the same URL.
#[derive(Debug, Clone, Copy)]
pub struct UrlNormalizer {
    force_https: bool,
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self { force_https: true }
    }
}

impl UrlNormalizer {
    /// Creates a normalizer; `force_https = false` keeps `http` links as they are
    pub fn new(force_https: bool) -> Self {
        Self { force_https }
    }

    /// Parses and normalizes a URL string
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_seek::url::UrlNormalizer;
    ///
    /// let url = UrlNormalizer::default()
    ///     .normalize("http://EXAMPLE.com/docs/?b=2&a=1#intro")
    ///     .unwrap();
    /// assert_eq!(url.as_str(), "https://example.com/docs?a=1&b=2");
    /// ```
    pub fn normalize(&self, url_str: &str) -> Result<Url, UrlError> {
        let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
        self.normalize_url(url)
    }

    /// Normalizes an already parsed URL
    pub fn normalize_url(&self, mut url: Url) -> Result<Url, UrlError> {
        match url.scheme() {
            "https" => {}
            "http" => {
                if self.force_https {
                    url.set_scheme("https").map_err(|_| {
                        UrlError::InvalidScheme("cannot upgrade to https".to_string())
                    })?;
                }
            }
            other => return Err(UrlError::InvalidScheme(other.to_string())),
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(UrlError::MissingDomain);
        }

        if url.port().is_some() && url.port() == default_port(url.scheme()) {
            // Cannot fail for http(s) URLs with a host
            let _ = url.set_port(None);
        }

        let trimmed = url.path().trim_end_matches('/');
        let path = if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        };
        url.set_path(&path);

        url.set_fragment(None);

        let mut params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        if params.is_empty() {
            url.set_query(None);
        } else {
            params.sort_by(|a, b| a.0.cmp(&b.0));
            url.query_pairs_mut().clear().extend_pairs(params.iter());
        }

        Ok(url)
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}
