//! Running totals kept by each siphon.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters describing a siphon's traffic.
#[derive(Debug, Default)]
pub struct FlowMetrics {
    /// Items handed to the downstream drain.
    delivered: AtomicU64,
    /// Items that had to wait in the buffer.
    held: AtomicU64,
    /// Pending values that resolved, with a value or a failure.
    resolved: AtomicU64,
    /// Terminal failures forwarded downstream.
    failed: AtomicU64,
    /// Largest buffer length observed.
    peak_held: AtomicUsize,
}

impl FlowMetrics {
    /// Records a delivery.
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an item entering the buffer while delivery was blocked.
    pub fn record_held(&self, buffer_len: usize) {
        self.held.fetch_add(1, Ordering::Relaxed);
        self.peak_held.fetch_max(buffer_len, Ordering::Relaxed);
    }

    /// Records a pending value resolving.
    pub fn record_resolved(&self) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a terminal failure.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of delivered items.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Returns the number of items that waited in the buffer.
    #[must_use]
    pub fn held(&self) -> u64 {
        self.held.load(Ordering::Relaxed)
    }

    /// Returns the number of resolved pending values.
    #[must_use]
    pub fn resolved(&self) -> u64 {
        self.resolved.load(Ordering::Relaxed)
    }

    /// Returns the number of terminal failures.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Returns the largest buffer length observed.
    #[must_use]
    pub fn peak_held(&self) -> usize {
        self.peak_held.load(Ordering::Relaxed)
    }

    /// Returns the share of delivered items that were held first, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn held_rate(&self) -> f64 {
        let delivered = self.delivered();
        if delivered == 0 {
            0.0
        } else {
            (self.held() as f64 / delivered as f64) * 100.0
        }
    }

    /// Converts metrics to a dictionary.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "delivered": self.delivered(),
            "held": self.held(),
            "resolved": self.resolved(),
            "failed": self.failed(),
            "peak_held": self.peak_held(),
            "held_rate_percent": (self.held_rate() * 100.0).round() / 100.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_default() {
        let metrics = FlowMetrics::default();
        assert_eq!(metrics.delivered(), 0);
        assert_eq!(metrics.peak_held(), 0);
        assert_eq!(metrics.held_rate(), 0.0);
    }

    #[test]
    fn test_peak_tracks_maximum() {
        let metrics = FlowMetrics::default();
        metrics.record_held(1);
        metrics.record_held(3);
        metrics.record_held(2);

        assert_eq!(metrics.held(), 3);
        assert_eq!(metrics.peak_held(), 3);
    }

    #[test]
    fn test_metrics_to_dict() {
        let metrics = FlowMetrics::default();
        metrics.record_held(1);
        metrics.record_delivered();
        metrics.record_delivered();
        metrics.record_resolved();

        let dict = metrics.to_dict();
        assert_eq!(dict["delivered"], 2);
        assert_eq!(dict["resolved"], 1);
        assert_eq!(dict["failed"], 0);
        assert_eq!(dict["held_rate_percent"], 50.0);
    }
}
