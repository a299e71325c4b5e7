//! Observability and Metrics
//!
//! Per-session counters for the event engine: how many events were dispatched or
//! forwarded, how correlated requests ended, and how often handlers or decoders failed.
//!
//! Uses atomic counters for thread-safe metrics collection. Each session owns its
//! own `SessionMetrics`; there is no process-wide instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for one protocol session
#[derive(Debug)]
pub struct SessionMetrics {
    /// Events routed to at least one subscribed module
    pub events_dispatched: AtomicU64,
    /// Events with no subscriber, handed to the user-facing layer
    pub events_forwarded: AtomicU64,
    /// Correlated requests written to the transport
    pub requests_sent: AtomicU64,
    /// Replies matched to a pending request
    pub replies_matched: AtomicU64,
    /// Requests that got no reply in time
    pub request_timeouts: AtomicU64,
    /// Requests resolved by session teardown
    pub requests_cancelled: AtomicU64,
    /// Handler invocations that returned an error
    pub handler_failures: AtomicU64,
    /// Inbound payloads that failed to decode
    pub decode_failures: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            events_dispatched: AtomicU64::new(0),
            events_forwarded: AtomicU64::new(0),
            requests_sent: AtomicU64::new(0),
            replies_matched: AtomicU64::new(0),
            request_timeouts: AtomicU64::new(0),
            requests_cancelled: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_forwarded(&self) {
        self.events_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reply_matched(&self) {
        self.replies_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_timeout(&self) {
        self.request_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_cancelled(&self) {
        self.requests_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_forwarded: self.events_forwarded.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            replies_matched: self.replies_matched.load(Ordering::Relaxed),
            request_timeouts: self.request_timeouts.load(Ordering::Relaxed),
            requests_cancelled: self.requests_cancelled.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            events_dispatched = snapshot.events_dispatched,
            events_forwarded = snapshot.events_forwarded,
            requests_sent = snapshot.requests_sent,
            replies_matched = snapshot.replies_matched,
            request_timeouts = snapshot.request_timeouts,
            requests_cancelled = snapshot.requests_cancelled,
            handler_failures = snapshot.handler_failures,
            decode_failures = snapshot.decode_failures,
            uptime_seconds = snapshot.uptime_seconds,
            "Session metrics snapshot"
        );
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_dispatched: u64,
    pub events_forwarded: u64,
    pub requests_sent: u64,
    pub replies_matched: u64,
    pub request_timeouts: u64,
    pub requests_cancelled: u64,
    pub handler_failures: u64,
    pub decode_failures: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = SessionMetrics::new();
        metrics.event_dispatched();
        metrics.event_dispatched();
        metrics.event_forwarded();
        metrics.request_timeout();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_dispatched, 2);
        assert_eq!(snapshot.events_forwarded, 1);
        assert_eq!(snapshot.request_timeouts, 1);
        assert_eq!(snapshot.replies_matched, 0);
    }
}
