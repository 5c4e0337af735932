//! Per-identifier fixed-window rate limiting.
//!
//! Each identifier gets `max_requests` admissions per window. The window
//! starts on the identifier's first request and restarts on the first
//! request after it has elapsed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::clock::{Clock, SystemClock};

/// Window state for one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRecord {
    pub window_start: Instant,
    pub count: u32,
}

impl RateRecord {
    fn fresh(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 1,
        }
    }
}

/// Outcome of a single rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Admitted; `count` is the identifier's count after this request.
    Allowed { count: u32 },
    /// Ceiling reached for the current window.
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Snapshot row for the admin endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedClient {
    pub identifier: String,
    pub count: u32,
    pub window_elapsed_secs: u64,
}

/// In-memory rate table owned by a gate instance.
///
/// The check for one identifier runs under that identifier's map entry
/// lock, so concurrent requests from the same client are serialized.
pub struct RateLimiter {
    records: DashMap<String, RateRecord>,
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            max_requests,
            window,
            clock,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count one request from `identifier` and decide whether it may pass.
    pub fn check(&self, identifier: &str) -> RateDecision {
        let now = self.clock.now();

        match self.records.entry(identifier.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateRecord::fresh(now));
                RateDecision::Allowed { count: 1 }
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if now.duration_since(record.window_start) > self.window {
                    *record = RateRecord::fresh(now);
                    RateDecision::Allowed { count: 1 }
                } else if record.count >= self.max_requests {
                    RateDecision::Limited {
                        retry_after: self.window,
                    }
                } else {
                    record.count += 1;
                    RateDecision::Allowed {
                        count: record.count,
                    }
                }
            }
        }
    }

    /// Current record for `identifier`, if any.
    pub fn record(&self, identifier: &str) -> Option<RateRecord> {
        self.records.get(identifier).map(|r| *r)
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    /// Drop records whose window has elapsed. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let before = self.records.len();
        self.records
            .retain(|_, record| now.duration_since(record.window_start) <= self.window);
        before.saturating_sub(self.records.len())
    }

    pub fn snapshot(&self) -> Vec<TrackedClient> {
        let now = self.clock.now();
        let mut clients: Vec<TrackedClient> = self
            .records
            .iter()
            .map(|entry| TrackedClient {
                identifier: entry.key().clone(),
                count: entry.count,
                window_elapsed_secs: now.duration_since(entry.window_start).as_secs(),
            })
            .collect();
        clients.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        clients
    }
}

/// Background task that prunes expired records.
pub struct RatePruner {
    limiter: Arc<RateLimiter>,
    interval: Duration,
}

impl RatePruner {
    pub fn new(limiter: Arc<RateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Rate record pruning disabled");
            return;
        }

        tracing::info!(interval = ?self.interval, "Rate pruner starting");

        let mut ticker = time::interval(self.interval);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.limiter.prune();
                    let tracked = self.limiter.tracked();
                    metrics::set_tracked_clients(tracked);
                    if removed > 0 {
                        tracing::debug!(removed, tracked, "Pruned expired rate records");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate pruner received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    fn limiter(max: u32, window_secs: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter =
            RateLimiter::with_clock(max, Duration::from_secs(window_secs), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_admits_exactly_ceiling_per_window() {
        let (rl, _clock) = limiter(3, 60);
        assert!(rl.check("1.2.3.4").is_allowed());
        assert!(rl.check("1.2.3.4").is_allowed());
        assert_eq!(rl.check("1.2.3.4"), RateDecision::Allowed { count: 3 });
        assert_eq!(
            rl.check("1.2.3.4"),
            RateDecision::Limited {
                retry_after: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn test_rejection_does_not_increment() {
        let (rl, _clock) = limiter(2, 60);
        for _ in 0..10 {
            rl.check("a");
        }
        assert_eq!(rl.record("a").unwrap().count, 2);
    }

    #[test]
    fn test_window_reset_after_expiry() {
        let (rl, clock) = limiter(2, 60);
        rl.check("a");
        rl.check("a");
        assert!(!rl.check("a").is_allowed());

        clock.advance(Duration::from_secs(61));
        assert_eq!(rl.check("a"), RateDecision::Allowed { count: 1 });
        assert_eq!(rl.record("a").unwrap().window_start, clock.now());
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let (rl, clock) = limiter(1, 60);
        rl.check("a");
        clock.advance(Duration::from_secs(60));
        // Exactly one window later still counts against the old window.
        assert!(!rl.check("a").is_allowed());
        clock.advance(Duration::from_millis(1));
        assert!(rl.check("a").is_allowed());
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (rl, _clock) = limiter(1, 60);
        assert!(rl.check("a").is_allowed());
        assert!(!rl.check("a").is_allowed());
        assert!(rl.check("b").is_allowed());
        assert_eq!(rl.tracked(), 2);
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let (rl, clock) = limiter(5, 60);
        rl.check("old");
        clock.advance(Duration::from_secs(45));
        rl.check("new");
        clock.advance(Duration::from_secs(30));

        assert_eq!(rl.prune(), 1);
        assert!(rl.record("old").is_none());
        assert!(rl.record("new").is_some());
    }

    #[test]
    fn test_snapshot_sorted() {
        let (rl, clock) = limiter(5, 60);
        rl.check("b");
        rl.check("a");
        rl.check("a");
        clock.advance(Duration::from_secs(7));

        let snap = rl.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].identifier, "a");
        assert_eq!(snap[0].count, 2);
        assert_eq!(snap[0].window_elapsed_secs, 7);
    }

    #[test]
    fn test_concurrent_checks_respect_ceiling() {
        let rl = Arc::new(RateLimiter::new(50, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rl = rl.clone();
                std::thread::spawn(move || {
                    (0..20).filter(|_| rl.check("same").is_allowed()).count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }

    #[tokio::test]
    async fn test_pruner_exits_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let rl = Arc::new(RateLimiter::new(1, Duration::from_secs(1)));
        let pruner = RatePruner::new(rl, Duration::from_millis(10));
        let handle = tokio::spawn(pruner.run(rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
