//! In-process counters, reported by `/health`

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Metrics {
    bridge_mocked: AtomicU64,
    bridge_fetched: AtomicU64,
    bridge_cached: AtomicU64,
    bridge_failed: AtomicU64,
    uploads_stored: AtomicU64,
    images_rendered: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = name, "Metric incremented");
    }

    /// Bridge request answered from a mock record
    pub fn bridge_mocked(&self) {
        Self::bump(&self.bridge_mocked, "bridge_mocked");
    }

    /// Bridge request answered by the upstream over the network
    pub fn bridge_fetched(&self) {
        Self::bump(&self.bridge_fetched, "bridge_fetched");
    }

    /// Bridge request answered from the shared response cache
    pub fn bridge_cached(&self) {
        Self::bump(&self.bridge_cached, "bridge_cached");
    }

    pub fn bridge_failed(&self) {
        Self::bump(&self.bridge_failed, "bridge_failed");
    }

    pub fn upload_stored(&self) {
        Self::bump(&self.uploads_stored, "uploads_stored");
    }

    pub fn image_rendered(&self) {
        Self::bump(&self.images_rendered, "images_rendered");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bridge_mocked: self.bridge_mocked.load(Ordering::Relaxed),
            bridge_fetched: self.bridge_fetched.load(Ordering::Relaxed),
            bridge_cached: self.bridge_cached.load(Ordering::Relaxed),
            bridge_failed: self.bridge_failed.load(Ordering::Relaxed),
            uploads_stored: self.uploads_stored.load(Ordering::Relaxed),
            images_rendered: self.images_rendered.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub bridge_mocked: u64,
    pub bridge_fetched: u64,
    pub bridge_cached: u64,
    pub bridge_failed: u64,
    pub uploads_stored: u64,
    pub images_rendered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let metrics = Metrics::new();
        metrics.bridge_mocked();
        metrics.bridge_mocked();
        metrics.bridge_failed();
        metrics.image_rendered();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                bridge_mocked: 2,
                bridge_failed: 1,
                images_rendered: 1,
                ..Default::default()
            }
        );
    }
}
