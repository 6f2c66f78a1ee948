//! Outcome counters shared by the workers of one crawl

use crate::state::TargetState;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Lock-free tallies updated by workers
#[derive(Debug, Default)]
pub struct CrawlCounters {
    delivered: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    duplicates: AtomicU64,
    max_depth_seen: AtomicU32,
}

impl CrawlCounters {
    /// Records the terminal state of a target processed at `depth`
    pub fn record(&self, state: TargetState, depth: u32) {
        let counter = match state {
            TargetState::Delivered => &self.delivered,
            TargetState::Skipped => &self.skipped,
            TargetState::Failed => &self.failed,
            TargetState::Queued | TargetState::InFlight => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.max_depth_seen.fetch_max(depth, Ordering::Relaxed);
    }

    /// Records a target dropped because its URL was already claimed
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            max_depth_seen: self.max_depth_seen.load(Ordering::Relaxed),
        }
    }
}

/// Final statistics of one crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub delivered: u64,
    pub skipped: u64,
    pub failed: u64,
    pub duplicates: u64,
    pub max_depth_seen: u32,
}

impl CrawlStats {
    /// Targets that reached a terminal state
    pub fn processed(&self) -> u64 {
        self.delivered + self.skipped + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let counters = CrawlCounters::default();
        counters.record(TargetState::Delivered, 0);
        counters.record(TargetState::Delivered, 2);
        counters.record(TargetState::Skipped, 1);
        counters.record(TargetState::Failed, 1);
        counters.record(TargetState::InFlight, 5);
        counters.record_duplicate();

        let stats = counters.snapshot();
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.max_depth_seen, 2);
        assert_eq!(stats.processed(), 4);
    }
}
