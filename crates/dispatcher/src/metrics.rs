//! Per-sink delivery metrics
//!
//! Local atomics back the snapshot printed at shutdown; every update is also
//! mirrored to the `metrics` facade labelled by sink name.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single sink
#[derive(Debug)]
pub struct SinkMetrics {
    sink: String,
    /// Events waiting in the worker queue
    queue_len: AtomicUsize,
    /// Events written
    written: AtomicU64,
    /// Events the sink failed to write
    failed: AtomicU64,
    /// Events dropped because the queue was full
    dropped: AtomicU64,
}

impl SinkMetrics {
    pub fn new(sink: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            queue_len: AtomicUsize::new(0),
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
        metrics::gauge!("sink_queue_len", "sink" => self.sink.clone()).set(len as f64);
    }

    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("sink_events_total", "sink" => self.sink.clone(), "result" => "written")
            .increment(1);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("sink_events_total", "sink" => self.sink.clone(), "result" => "failed")
            .increment(1);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("sink_events_total", "sink" => self.sink.clone(), "result" => "dropped")
            .increment(1);
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len.load(Ordering::Relaxed),
            written: self.written(),
            failed: self.failed(),
            dropped: self.dropped(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub written: u64,
    pub failed: u64,
    pub dropped: u64,
}
