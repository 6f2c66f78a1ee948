//! Per-run robots.txt cache
//!
//! Policies are fetched on first use of a domain and kept for the rest of the
//! run. Failures are cached as permissive policies, so an unreachable or
//! missing robots.txt is requested once per domain.

use crate::robots::RobotsPolicy;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Lazily populated map from domain key to robots policy
#[derive(Debug)]
pub struct PolitenessCache {
    client: Client,
    user_agent: String,
    scheme: &'static str,
    timeout: Duration,
    policies: RwLock<HashMap<String, Arc<RobotsPolicy>>>,
}

impl PolitenessCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for robots.txt requests
    /// * `user_agent` - Agent string matched against `User-agent` groups
    /// * `force_https` - Request robots.txt over https instead of http
    /// * `timeout` - Upper bound for a single robots.txt request
    pub fn new(client: Client, user_agent: &str, force_https: bool, timeout: Duration) -> Self {
        Self {
            client,
            user_agent: user_agent.to_string(),
            scheme: if force_https { "https" } else { "http" },
            timeout,
            policies: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached policy for `domain`, fetching it on first use
    ///
    /// Concurrent first requests for the same domain may both fetch; the
    /// first one to publish wins and later callers see that policy.
    pub async fn get_policy(&self, domain: &str) -> Arc<RobotsPolicy> {
        if let Some(policy) = self.cached(domain) {
            return policy;
        }

        let policy = Arc::new(self.fetch_policy(domain).await);

        let mut policies = self
            .policies
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(policies.entry(domain.to_string()).or_insert(policy))
    }

    /// Returns the policy if it has already been fetched
    pub fn cached(&self, domain: &str) -> Option<Arc<RobotsPolicy>> {
        self.policies
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(domain)
            .cloned()
    }

    /// Number of domains with a published policy
    pub fn len(&self) -> usize {
        self.policies
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns true if no policy has been published yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn fetch_policy(&self, domain: &str) -> RobotsPolicy {
        let robots_url = format!("{}://{}/robots.txt", self.scheme, domain);

        let response = match self
            .client
            .get(&robots_url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt unavailable for {}: {}", domain, e);
                return RobotsPolicy::permissive(domain);
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                "robots.txt for {} returned {}, allowing all",
                domain,
                response.status()
            );
            return RobotsPolicy::permissive(domain);
        }

        match response.text().await {
            Ok(body) => {
                let policy = RobotsPolicy::parse(domain, &body, &self.user_agent);
                tracing::debug!(
                    "robots.txt for {}: {} disallow rules, crawl-delay {:?}",
                    domain,
                    policy.disallow.len(),
                    policy.crawl_delay
                );
                policy
            }
            Err(e) => {
                tracing::debug!("Failed to read robots.txt body for {}: {}", domain, e);
                RobotsPolicy::permissive(domain)
            }
        }
    }
}
