//! Robots.txt parser implementation
//!
//! Only `User-agent`, `Disallow` and `Crawl-delay` are understood. `Disallow`
//! values are literal path prefixes; there is no `Allow` and no wildcard
//! matching.

use std::time::Duration;

/// Crawl rules for one domain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsPolicy {
    /// Domain key the policy was fetched for
    pub domain: String,

    /// Disallowed path prefixes
    pub disallow: Vec<String>,

    /// Requested delay between requests (zero when unspecified)
    pub crawl_delay: Duration,
}

impl RobotsPolicy {
    /// A policy that permits everything with no delay
    pub fn permissive(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            ..Self::default()
        }
    }

    /// Parses robots.txt content for the given user agent
    ///
    /// Consecutive `User-agent` lines form one group. A group applies when
    /// one of its lines is `*`, the agent's product token (the part before
    /// `/`), or the full agent string, compared case-insensitively. Rules in
    /// groups that do not apply are ignored. For `Crawl-delay` the last value
    /// in an applicable group wins.
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_seek::robots::RobotsPolicy;
    ///
    /// let policy = RobotsPolicy::parse(
    ///     "example.com",
    ///     "User-agent: *\nDisallow: /private\nCrawl-delay: 2",
    ///     "sumi-seek/1.0",
    /// );
    /// assert!(!policy.can_crawl("/private/page"));
    /// assert!(policy.can_crawl("/public"));
    /// ```
    pub fn parse(domain: &str, content: &str, user_agent: &str) -> Self {
        let full_agent = user_agent.trim().to_lowercase();
        let product_token = full_agent
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let mut policy = Self::permissive(domain);
        let mut group_applies = false;
        let mut in_agent_lines = false;

        for line in content.lines() {
            // Strip comments
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        group_applies = false;
                        in_agent_lines = true;
                    }
                    let agent = value.to_lowercase();
                    if agent == "*" || agent == product_token || agent == full_agent {
                        group_applies = true;
                    }
                }
                "disallow" => {
                    in_agent_lines = false;
                    if group_applies && !value.is_empty() {
                        policy.disallow.push(value.to_string());
                    }
                }
                "crawl-delay" => {
                    in_agent_lines = false;
                    if group_applies {
                        if let Some(delay) = parse_delay(value) {
                            policy.crawl_delay = delay;
                        }
                    }
                }
                _ => {
                    in_agent_lines = false;
                }
            }
        }

        policy
    }

    /// Returns false iff some disallowed prefix is a prefix of `path`
    pub fn can_crawl(&self, path: &str) -> bool {
        !self
            .disallow
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Parses a non-negative number of seconds, integer or decimal
fn parse_delay(value: &str) -> Option<Duration> {
    let seconds = value.parse::<f64>().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}
