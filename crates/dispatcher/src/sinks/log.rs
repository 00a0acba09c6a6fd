//! LogSink - logs emitted stream events via tracing

use contracts::{ContractError, EventSink, StreamEvent, StreamEventKind};
use tracing::{info, instrument};

/// Sink that logs every emitted event
pub struct LogSink {
    name: String,
    written: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: 0,
        }
    }

    fn log_event(&self, event: &StreamEvent) {
        match &event.kind {
            StreamEventKind::Ttl { line, state } => info!(
                sink = %self.name,
                stream_id = event.stream_id,
                sample_number = event.sample_number,
                line,
                state,
                "TTL event"
            ),
            StreamEventKind::Text(text) => info!(
                sink = %self.name,
                stream_id = event.stream_id,
                sample_number = event.sample_number,
                text = %text,
                "Text event"
            ),
            StreamEventKind::SyncMarker {
                soft_seconds,
                soft_sample_zero,
                ..
            } => info!(
                sink = %self.name,
                stream_id = event.stream_id,
                sample_number = event.sample_number,
                soft_seconds,
                soft_sample_zero,
                "Sync marker"
            ),
        }
    }
}

impl EventSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        level = "trace",
        name = "log_sink_write",
        skip(self, event),
        fields(sink = %self.name, kind = event.kind.name())
    )]
    async fn write(&mut self, event: &StreamEvent) -> Result<(), ContractError> {
        self.log_event(event);
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, events = self.written, "LogSink closed");
        Ok(())
    }
}
