//! Crawler coordinator - crawl orchestration
//!
//! [`Crawler::crawl`] builds the per-run state (frontier, visited set,
//! politeness cache, rate limiter), starts a fixed pool of worker tasks and
//! hands back the page and error streams immediately. A supervisor task joins
//! the workers and closes both streams once they are done.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::fetcher::{build_http_client, FetchError, Fetcher, Page};
use crate::crawler::frontier::{CrawlTarget, Frontier, VisitedSet};
use crate::crawler::parser::{HtmlExtractor, TextExtractor};
use crate::crawler::rate_limiter::RateLimiter;
use crate::robots::PolitenessCache;
use crate::state::{CrawlCounters, CrawlStats, TargetState};
use crate::url::{check_crawlable, domain_key, UrlNormalizer};
use crate::SeekError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A failed target, emitted on the error stream
#[derive(Debug, Error)]
#[error("failed to crawl {url} (depth {depth}): {source}")]
pub struct CrawlError {
    pub url: Url,
    pub depth: u32,
    #[source]
    pub source: FetchError,
}

/// Controls for a running crawl
#[derive(Debug, Clone)]
pub struct CrawlControl {
    limiter: Arc<RateLimiter>,
    cancel: CancellationToken,
}

impl CrawlControl {
    /// Changes the per-domain rate of the running crawl
    pub fn set_rate_limit(&self, rate: f64) {
        self.limiter.set_rate_limit(rate);
    }

    /// Stops the crawl; both streams close once the workers exit
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Streams and controls of a crawl started by [`Crawler::crawl`]
#[derive(Debug)]
pub struct CrawlHandle {
    /// Successfully fetched pages, in completion order
    pub pages: mpsc::Receiver<Page>,

    /// Targets that failed to fetch or parse
    pub errors: mpsc::Receiver<CrawlError>,

    pub control: CrawlControl,

    /// Resolves with the run's statistics after both streams are closed
    pub completion: JoinHandle<CrawlStats>,
}

/// Web crawler with a fixed-size worker pool
pub struct Crawler {
    config: CrawlerConfig,
    user_agent: UserAgentConfig,
    client: Client,
    extractor: Arc<dyn TextExtractor>,
}

impl Crawler {
    /// Creates a crawler using the `scraper`-based extractor
    pub fn new(config: CrawlerConfig, user_agent: UserAgentConfig) -> Result<Self, SeekError> {
        let client = build_http_client(&user_agent, Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            config,
            user_agent,
            client,
            extractor: Arc::new(HtmlExtractor),
        })
    }

    /// Replaces the text extractor used by subsequent crawls
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Sets the per-domain rate for subsequent crawls
    ///
    /// Use [`CrawlControl::set_rate_limit`] to change a running crawl.
    pub fn set_rate_limit(&mut self, rate: f64) {
        self.config.rate_limit = rate;
    }

    /// Sets the worker count for subsequent crawls
    pub fn set_max_workers(&mut self, workers: usize) {
        self.config.max_workers = workers.max(1);
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Starts crawling from `start_url` and returns immediately
    ///
    /// Links are followed while the current depth is below `max_depth`; with
    /// `max_depth = 0` only the seed is fetched. The crawl ends when the
    /// frontier is exhausted, `cancel` fires, or the configured deadline
    /// passes. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if `start_url` cannot be parsed or normalized.
    pub fn crawl(
        &self,
        start_url: &str,
        max_depth: u32,
        cancel: CancellationToken,
    ) -> Result<CrawlHandle, SeekError> {
        let normalizer = UrlNormalizer::new(self.config.force_https);
        let seed = normalizer.normalize(start_url)?;

        let (page_tx, page_rx) = mpsc::channel(self.config.output_buffer.max(1));
        let (error_tx, error_rx) = mpsc::channel(self.config.output_buffer.max(1));

        let cancel = cancel.child_token();
        let limiter = Arc::new(RateLimiter::new(self.config.rate_limit));

        let run = Arc::new(CrawlRun {
            max_depth,
            respect_robots: self.config.respect_robots,
            honor_crawl_delay: self.config.honor_crawl_delay,
            fetcher: Fetcher::new(
                self.client.clone(),
                Arc::clone(&self.extractor),
                normalizer,
                self.config.max_page_size,
            ),
            robots: PolitenessCache::new(
                self.client.clone(),
                &self.user_agent.header_value(),
                self.config.force_https,
                Duration::from_secs(self.config.robots_timeout_secs),
            ),
            limiter: Arc::clone(&limiter),
            frontier: Arc::new(Frontier::new(self.config.frontier_capacity)),
            visited: VisitedSet::new(),
            counters: CrawlCounters::default(),
            pages: page_tx,
            errors: error_tx,
            cancel: cancel.clone(),
        });

        tracing::info!(
            "Starting crawl of {} (max depth {}, {} workers)",
            seed,
            max_depth,
            self.config.max_workers
        );

        if !run.frontier.seed(CrawlTarget {
            url: seed,
            depth: 0,
        }) {
            tracing::error!("Failed to seed the frontier");
        }

        let workers: Vec<JoinHandle<()>> = (0..self.config.max_workers.max(1))
            .map(|id| tokio::spawn(run_worker(Arc::clone(&run), id)))
            .collect();

        let deadline = spawn_deadline(
            cancel.clone(),
            Duration::from_secs(self.config.crawl_timeout_secs),
        );

        let completion = tokio::spawn(async move {
            for worker in workers {
                if let Err(e) = worker.await {
                    tracing::error!("Crawl worker terminated abnormally: {}", e);
                }
            }
            deadline.abort();

            let stats = run.counters.snapshot();
            tracing::info!(
                "Crawl finished: {} delivered, {} skipped, {} failed, {} duplicates",
                stats.delivered,
                stats.skipped,
                stats.failed,
                stats.duplicates
            );
            // Dropping the run drops the stream senders
            drop(run);
            stats
        });

        Ok(CrawlHandle {
            pages: page_rx,
            errors: error_rx,
            control: CrawlControl { limiter, cancel },
            completion,
        })
    }
}

/// Cancels `cancel` once `after` has elapsed
fn spawn_deadline(cancel: CancellationToken, after: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                tracing::warn!("Crawl deadline of {:?} reached, stopping", after);
                cancel.cancel();
            }
        }
    })
}

/// State owned by one crawl invocation
struct CrawlRun {
    max_depth: u32,
    respect_robots: bool,
    honor_crawl_delay: bool,
    fetcher: Fetcher,
    robots: PolitenessCache,
    limiter: Arc<RateLimiter>,
    frontier: Arc<Frontier>,
    visited: VisitedSet,
    counters: CrawlCounters,
    pages: mpsc::Sender<Page>,
    errors: mpsc::Sender<CrawlError>,
    cancel: CancellationToken,
}

async fn run_worker(run: Arc<CrawlRun>, id: usize) {
    tracing::debug!("Worker {} started", id);

    while let Some(target) = run.frontier.next(&run.cancel).await {
        let depth = target.depth;
        if !run.visited.insert_if_absent(target.url.as_str()) {
            run.counters.record_duplicate();
        } else if let Some(outcome) = run.process(target).await {
            match TargetState::InFlight.transition(outcome) {
                Ok(state) => run.counters.record(state, depth),
                Err(e) => tracing::error!("{}", e),
            }
        }
        run.frontier.complete();
    }

    tracing::debug!("Worker {} exiting", id);
}

impl CrawlRun {
    /// Handles one claimed target; `None` means it was abandoned on cancellation
    async fn process(&self, target: CrawlTarget) -> Option<TargetState> {
        if let Err(reason) = check_crawlable(&target.url) {
            tracing::debug!("Skipping {}: {}", target.url, reason);
            return Some(TargetState::Skipped);
        }

        let Some(domain) = domain_key(&target.url) else {
            return Some(TargetState::Skipped);
        };

        let mut floor = Duration::ZERO;
        if self.respect_robots {
            let policy = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                policy = self.robots.get_policy(&domain) => policy,
            };
            if !policy.can_crawl(target.url.path()) {
                tracing::debug!("Skipping {}: disallowed by robots.txt", target.url);
                return Some(TargetState::Skipped);
            }
            if self.honor_crawl_delay {
                floor = policy.crawl_delay;
            }
        }

        tokio::select! {
            _ = self.cancel.cancelled() => return None,
            _ = self.limiter.acquire_with_floor(&domain, floor) => {}
        }

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            result = self.fetcher.fetch_and_parse(&target.url, target.depth) => result,
        };

        match result {
            Ok(page) => {
                tracing::debug!(
                    "Fetched {} (depth {}, {} links)",
                    page.url,
                    page.depth,
                    page.links.len()
                );

                let children = if target.depth < self.max_depth {
                    page.links.clone()
                } else {
                    Vec::new()
                };

                tokio::select! {
                    _ = self.cancel.cancelled() => return None,
                    sent = self.pages.send(page) => {
                        if sent.is_err() {
                            tracing::debug!("Page stream closed, dropping {}", target.url);
                        }
                    }
                }

                for url in children {
                    if self.visited.contains(url.as_str()) {
                        continue;
                    }
                    let child = CrawlTarget {
                        url,
                        depth: target.depth + 1,
                    };
                    if !self.frontier.enqueue(child, &self.cancel).await {
                        break;
                    }
                }

                Some(TargetState::Delivered)
            }
            Err(source) => {
                tracing::warn!("Failed to fetch {}: {}", target.url, source);
                let error = CrawlError {
                    url: target.url,
                    depth: target.depth,
                    source,
                };

                tokio::select! {
                    _ = self.cancel.cancelled() => return None,
                    sent = self.errors.send(error) => {
                        if sent.is_err() {
                            tracing::debug!("Error stream closed");
                        }
                    }
                }

                Some(TargetState::Failed)
            }
        }
    }
}
