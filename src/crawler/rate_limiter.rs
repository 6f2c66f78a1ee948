//! Per-domain request rate limiting
//!
//! Each domain gets a periodic ticker on first use. Workers take one tick per
//! request, so requests to one domain are spaced by at least the interval
//! while different domains never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};

/// Longest a worker waits for a tick before proceeding anyway
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

type Gate = Mutex<Interval>;

#[derive(Debug)]
struct GateTable {
    interval: Option<Duration>,
    gates: HashMap<String, Arc<Gate>>,
}

/// Shared per-domain rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    table: RwLock<GateTable>,
}

impl RateLimiter {
    /// Creates a limiter allowing `rate` requests per second per domain
    ///
    /// A rate of zero or less disables limiting.
    pub fn new(rate: f64) -> Self {
        Self {
            table: RwLock::new(GateTable {
                interval: interval_for(rate),
                gates: HashMap::new(),
            }),
        }
    }

    /// Waits for the domain's next slot
    ///
    /// Returns false if the grace timeout elapsed first; the caller proceeds
    /// either way.
    pub async fn acquire(&self, domain: &str) -> bool {
        self.acquire_with_floor(domain, Duration::ZERO).await
    }

    /// Like [`acquire`](Self::acquire), but the domain's interval is at least `floor`
    ///
    /// The floor only takes effect when the domain's gate is created.
    pub async fn acquire_with_floor(&self, domain: &str, floor: Duration) -> bool {
        let Some(gate) = self.gate_for(domain, floor) else {
            return true;
        };

        let wait = async {
            gate.lock().await.tick().await;
        };

        match tokio::time::timeout(ACQUIRE_TIMEOUT, wait).await {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("Rate gate for {} timed out, proceeding", domain);
                false
            }
        }
    }

    /// Replaces the rate and discards every existing gate
    pub fn set_rate_limit(&self, rate: f64) {
        let mut table = self
            .table
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table.interval = interval_for(rate);
        table.gates.clear();
        tracing::info!("Rate limit set to {} requests/second per domain", rate);
    }

    /// Current minimum interval between requests to one domain
    pub fn interval(&self) -> Option<Duration> {
        self.table
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .interval
    }

    /// Number of domains with a live gate
    pub fn domain_count(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gates
            .len()
    }

    fn gate_for(&self, domain: &str, floor: Duration) -> Option<Arc<Gate>> {
        {
            let table = self
                .table
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(gate) = table.gates.get(domain) {
                return Some(Arc::clone(gate));
            }
        }

        let mut table = self
            .table
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let period = table.interval.unwrap_or(Duration::ZERO).max(floor);
        if period.is_zero() {
            return None;
        }

        let gate = table.gates.entry(domain.to_string()).or_insert_with(|| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Arc::new(Mutex::new(ticker))
        });
        Some(Arc::clone(gate))
    }
}

/// Converts requests per second into a tick interval
pub fn interval_for(rate: f64) -> Option<Duration> {
    if rate.is_finite() && rate > 0.0 {
        Some(Duration::from_secs_f64(1.0 / rate))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_interval_for() {
        assert_eq!(interval_for(2.0), Some(Duration::from_millis(500)));
        assert_eq!(interval_for(0.1), Some(Duration::from_secs(10)));
        assert_eq!(interval_for(0.0), None);
        assert_eq!(interval_for(-1.0), None);
        assert_eq!(interval_for(f64::INFINITY), None);
    }

    #[tokio::test]
    async fn test_same_domain_is_spaced() {
        let limiter = RateLimiter::new(20.0);
        let start = Instant::now();

        for _ in 0..4 {
            assert!(limiter.acquire("example.com").await);
        }

        // Four requests at 20/s need at least three intervals of 50ms
        assert!(start.elapsed() >= Duration::from_millis(145));
    }

    #[tokio::test]
    async fn test_distinct_domains_do_not_wait() {
        let limiter = RateLimiter::new(1.0);
        let start = Instant::now();

        for domain in ["a.com", "b.com", "c.com", "d.com"] {
            limiter.acquire(domain).await;
        }

        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(limiter.domain_count(), 4);
    }

    #[tokio::test]
    async fn test_disabled_limiter_is_noop() {
        let limiter = RateLimiter::new(0.0);
        let start = Instant::now();

        for _ in 0..10 {
            limiter.acquire("example.com").await;
        }

        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(limiter.domain_count(), 0);
    }

    #[tokio::test]
    async fn test_floor_applies_when_rate_disabled() {
        let limiter = RateLimiter::new(0.0);
        let start = Instant::now();

        limiter
            .acquire_with_floor("slow.com", Duration::from_millis(60))
            .await;
        limiter
            .acquire_with_floor("slow.com", Duration::from_millis(60))
            .await;

        assert!(start.elapsed() >= Duration::from_millis(55));
    }

    #[tokio::test]
    async fn test_set_rate_limit_resets_gates() {
        let limiter = RateLimiter::new(1.0);
        limiter.acquire("example.com").await;
        assert_eq!(limiter.domain_count(), 1);

        limiter.set_rate_limit(0.0);
        assert_eq!(limiter.domain_count(), 0);
        assert_eq!(limiter.interval(), None);

        let start = Instant::now();
        limiter.acquire("example.com").await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_acquire_gives_up_after_grace_timeout() {
        let limiter = RateLimiter::new(0.01);
        assert!(limiter.acquire("example.com").await);

        tokio::time::pause();
        // Next slot is 100s away; the grace timeout fires first
        assert!(!limiter.acquire("example.com").await);
    }
}
