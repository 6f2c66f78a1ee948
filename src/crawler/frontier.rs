//! Crawl frontier and visited set
//!
//! The frontier is a bounded queue of targets plus a count of outstanding
//! work. A target counts as outstanding from the moment it is enqueued until
//! the worker that handled it calls [`Frontier::complete`], which happens only
//! after the target's children were enqueued. When the count drops to zero no
//! target is queued or in flight and none can appear, so the frontier closes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// Absolute, normalized URL
    pub url: Url,

    /// Link hops from the seed
    pub depth: u32,
}

/// Normalized URLs claimed during one crawl
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: RwLock<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `url` and returns true if it was not present
    ///
    /// Check and insert happen under one write lock, so exactly one caller
    /// wins for each URL.
    pub fn insert_if_absent(&self, url: &str) -> bool {
        self.urls
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.to_string())
    }

    /// Advisory membership check
    pub fn contains(&self, url: &str) -> bool {
        self.urls
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded work queue shared by the workers of one crawl
#[derive(Debug)]
pub struct Frontier {
    sender: mpsc::Sender<CrawlTarget>,
    receiver: Mutex<mpsc::Receiver<CrawlTarget>>,
    pending: AtomicUsize,
    closed: CancellationToken,
}

impl Frontier {
    /// Creates a frontier holding at most `capacity` queued targets
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
            closed: CancellationToken::new(),
        }
    }

    /// Adds the first target of a run
    ///
    /// Returns false if the queue has no free slot, which cannot happen on a
    /// fresh frontier.
    pub fn seed(&self, target: CrawlTarget) -> bool {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.try_send(target).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Adds a target, waiting while the queue is full
    ///
    /// Returns false if `cancel` fired before a slot freed up or the queue is
    /// closed; the target is then dropped and no longer counted.
    pub async fn enqueue(&self, target: CrawlTarget, cancel: &CancellationToken) -> bool {
        self.pending.fetch_add(1, Ordering::AcqRel);

        let sent = tokio::select! {
            _ = cancel.cancelled() => false,
            result = self.sender.send(target) => result.is_ok(),
        };
        if !sent {
            self.complete();
        }
        sent
    }

    /// Waits for the next target
    ///
    /// Returns `None` once the frontier is exhausted or `cancel` fires.
    pub async fn next(&self, cancel: &CancellationToken) -> Option<CrawlTarget> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = self.closed.cancelled() => None,
            target = async { self.receiver.lock().await.recv().await } => target,
        }
    }

    /// Marks one previously enqueued target as fully handled
    pub fn complete(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            tracing::debug!("Frontier exhausted");
            self.closed.cancel();
        }
    }

    /// Number of targets queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
