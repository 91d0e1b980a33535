//! Session-scoped discovery cache.
//!
//! Holds the result of the last discovery run and guarantees that at most
//! one discovery runs at a time: callers arriving while a run is in flight
//! wait for it and share its result. Entries never expire on their own;
//! only [`DiscoveryCache::clear`] invalidates them.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::DiscoveryReport;

/// Memoized discovery result with single-flight population.
///
/// Create one per session and share it via `Arc`. Independent caches never
/// see each other's results.
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    slot: Mutex<Option<Arc<DiscoveryReport>>>,
    runs: AtomicU64,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached report, if any. Waits for an in-flight discovery.
    pub async fn get(&self) -> Option<Arc<DiscoveryReport>> {
        self.slot.lock().await.clone()
    }

    /// The cached report without waiting. `None` while a discovery or
    /// another cache update holds the slot.
    pub fn peek(&self) -> Option<Arc<DiscoveryReport>> {
        self.slot.try_lock().ok().and_then(|slot| slot.clone())
    }

    /// Store a report, replacing any previous one.
    pub async fn set(&self, report: DiscoveryReport) -> Arc<DiscoveryReport> {
        let report = Arc::new(report);
        *self.slot.lock().await = Some(report.clone());
        report
    }

    /// Drop the cached report. Returns true if one was present.
    ///
    /// A discovery in flight finishes first; its result is then discarded.
    pub async fn clear(&self) -> bool {
        let evicted = self.slot.lock().await.take().is_some();
        if evicted {
            tracing::debug!("Discovery cache cleared");
        }
        evicted
    }

    /// Return the cached report, or run `discover` and cache its result.
    ///
    /// The lock is held for the whole run, so concurrent callers queue
    /// behind the first one and then see its result. The stored report is
    /// stamped with this cache's run counter.
    pub async fn get_or_discover<F, Fut>(&self, discover: F) -> Arc<DiscoveryReport>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DiscoveryReport>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(report) = slot.as_ref() {
            tracing::debug!(run = report.run, "Discovery cache hit");
            return report.clone();
        }

        let mut report = discover().await;
        report.run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let report = Arc::new(report);
        *slot = Some(report.clone());
        report
    }

    /// Number of discovery runs this cache has started.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }
}
