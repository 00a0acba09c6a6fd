//! SinkFanout - emitter that copies every event to each configured sink

use tracing::{info, instrument};

use contracts::{EventEmitter, SinkConfig, SinkType, StreamEvent};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// Non-blocking emitter over a set of sink workers
pub struct SinkFanout {
    handles: Vec<SinkHandle>,
}

impl SinkFanout {
    /// Create a fanout with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>) -> Self {
        Self { handles }
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Close every sink queue and wait for the workers to finish
    #[instrument(name = "sink_fanout_shutdown", skip(self), fields(sinks = self.handles.len()))]
    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.shutdown().await;
        }
        info!("All sinks shut down");
    }
}

impl EventEmitter for SinkFanout {
    fn emit(&mut self, event: StreamEvent) {
        let Some((last, rest)) = self.handles.split_last() else {
            return;
        };
        for handle in rest {
            handle.try_send(event.clone());
        }
        last.try_send(event);
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Spawn one worker per sink config
///
/// Must be called from within a tokio runtime.
#[instrument(name = "dispatcher_create_fanout", skip(sink_configs), fields(sink_count = sink_configs.len()))]
pub fn create_fanout(sink_configs: &[SinkConfig]) -> Result<SinkFanout, DispatcherError> {
    let mut handles = Vec::with_capacity(sink_configs.len());
    for config in sink_configs {
        handles.push(create_sink_handle(config)?);
    }
    info!(sinks = handles.len(), "Sink fanout ready");
    Ok(SinkFanout { handles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StreamEventKind;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn marker(sample_number: i64) -> StreamEvent {
        StreamEvent {
            stream_id: 0,
            sample_number,
            kind: StreamEventKind::SyncMarker {
                local_sample_number: sample_number as u64,
                soft_seconds: 0.2,
                soft_sample_zero: sample_number - 6000,
            },
        }
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let mut fanout = SinkFanout::with_handles(vec![
            SinkHandle::spawn(LogSink::new("sink1"), 10),
            SinkHandle::spawn(LogSink::new("sink2"), 10),
        ]);

        for i in 0..5 {
            fanout.emit(marker(i * 1000));
        }

        let handles_metrics: Vec<_> = fanout
            .handles
            .iter()
            .map(|h| std::sync::Arc::clone(h.metrics()))
            .collect();
        fanout.shutdown().await;

        for metrics in handles_metrics {
            assert_eq!(metrics.written(), 5);
        }
    }

    #[tokio::test]
    async fn test_create_fanout_from_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let configs = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "file".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 50,
                params: HashMap::from([("path".to_string(), path.display().to_string())]),
            },
        ];

        let mut fanout = create_fanout(&configs).unwrap();
        assert_eq!(fanout.sink_count(), 2);
        fanout.emit(marker(3000));
        fanout.shutdown().await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_create_fanout_rejects_file_sink_without_path() {
        let configs = vec![SinkConfig {
            name: "broken".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 10,
            params: HashMap::new(),
        }];

        let result = create_fanout(&configs);
        assert!(matches!(result, Err(DispatcherError::SinkCreation { .. })));
    }

    #[test]
    fn test_empty_fanout_ignores_events() {
        let mut fanout = SinkFanout::with_handles(Vec::new());
        fanout.emit(marker(0));
        assert_eq!(fanout.sink_count(), 0);
    }
}
