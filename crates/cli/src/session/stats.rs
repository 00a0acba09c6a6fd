//! Session statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot as SinkSnapshot;
use ingestion::MetricsSnapshot as ListenerSnapshot;
use observability::SessionMetricsAggregator;

/// Statistics from a session run
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total duration of the session
    pub duration: Duration,

    /// Samples covered by all ticks
    pub samples_processed: u64,

    /// Completed sync pairings kept in history
    pub history_len: usize,

    /// Listener counters at shutdown
    pub listener: ListenerSnapshot,

    /// Per-sink delivery counters at shutdown
    pub sinks: Vec<(String, SinkSnapshot)>,

    /// Tick/sync/latency aggregation
    pub metrics: SessionMetricsAggregator,
}

impl SessionStats {
    /// Soft events placed per second of session time
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.total_emitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Session Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Samples processed: {}", self.samples_processed);
        println!("  Events/s: {:.2}", self.events_per_sec());
        println!("  Sync history: {}", self.history_len);

        println!("\nListener");
        println!("  Datagrams: {}", self.listener.datagrams_received);
        println!("  Enqueued: {}", self.listener.events_enqueued);
        println!("  Decode errors: {}", self.listener.decode_errors);
        println!("  Acks sent: {}", self.listener.acks_sent);
        println!("  Transport errors: {}", self.listener.transport_errors);

        println!("\n{}", self.metrics.summary());

        if !self.sinks.is_empty() {
            println!("Sinks");
            for (name, sink) in &self.sinks {
                println!(
                    "  {}: written={}, dropped={}, failed={}",
                    name, sink.written, sink.dropped, sink.failed
                );
            }
        }

        println!();
    }
}
