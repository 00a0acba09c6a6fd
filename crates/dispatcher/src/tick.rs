//! Per-tick dispatch of queued soft events into the local stream

use contracts::{
    EventEmitter, LocalPulse, SessionSettings, SoftEvent, SoftPayload, StreamEvent,
    StreamEventKind, TickBlock,
};
use ingestion::EventQueue;
use sync_engine::{CompletedSync, SyncEngine, SyncError, SyncFilter};
use tracing::{debug, instrument, warn};

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Soft events taken from the queue
    pub drained: usize,
    /// Stream events handed to the emitter (markers included)
    pub emitted: usize,
    /// Sync pairings completed during this tick
    pub syncs_completed: usize,
    /// Soft events dropped because no sync could place them
    pub unsynchronized: Vec<SyncError>,
    /// Earliest receipt time among drained events (ms since Unix epoch)
    pub oldest_receipt_ms: Option<i64>,
}

/// Places soft events into the selected stream once per processing tick
///
/// Owns the sync engine; the queue is the only state shared with the
/// listener.
pub struct TickDispatcher<E: EventEmitter> {
    stream_id: u16,
    emit_sync_markers: bool,
    queue: EventQueue,
    engine: SyncEngine,
    emitter: E,
    /// Pairings completed through `on_local_pulse` since the last tick
    pending: TickReport,
}

impl<E: EventEmitter> TickDispatcher<E> {
    pub fn new(settings: &SessionSettings, queue: EventQueue, emitter: E) -> Self {
        Self {
            stream_id: settings.stream_id,
            emit_sync_markers: settings.emit_sync_markers,
            queue,
            engine: SyncEngine::new(SyncFilter::from_settings(settings)),
            emitter,
            pending: TickReport::default(),
        }
    }

    /// Run one tick
    ///
    /// Local pulses detected in this block are delivered before the queue is
    /// drained, so a soft twin that arrived in the same tick can pair with
    /// them. Pairings completed through `on_local_pulse` since the previous
    /// tick are counted in this tick's report.
    #[instrument(
        level = "debug",
        name = "dispatcher_tick",
        skip(self, block, pulses),
        fields(first_sample = block.first_sample, pulses = pulses.len())
    )]
    pub fn tick(&mut self, block: &TickBlock, pulses: &[LocalPulse]) -> TickReport {
        let mut report = std::mem::take(&mut self.pending);

        for pulse in pulses {
            if let Some(sync) = self.engine.on_local_pulse(pulse, block.sample_rate) {
                self.complete_sync(sync, &mut report);
            }
        }

        let events = self.queue.drain();
        report.drained = events.len();
        report.oldest_receipt_ms = events.iter().filter_map(|e| e.received_at_ms).min();

        for event in events {
            self.dispatch_event(event, block.sample_rate, &mut report);
        }

        if report.drained > 0 {
            metrics::histogram!("dispatcher_tick_drained").record(report.drained as f64);
            debug!(
                drained = report.drained,
                emitted = report.emitted,
                unsynchronized = report.unsynchronized.len(),
                "Tick dispatched"
            );
        }

        report
    }

    /// Deliver a local pulse outside of `tick`
    ///
    /// For hosts that report line transitions through a callback. A marker is
    /// emitted if this completes a pairing, and both show up in the next
    /// tick's report.
    pub fn on_local_pulse(&mut self, pulse: &LocalPulse, sample_rate: f64) -> Option<CompletedSync> {
        let sync = self.engine.on_local_pulse(pulse, sample_rate)?;
        let mut pending = std::mem::take(&mut self.pending);
        self.complete_sync(sync, &mut pending);
        self.pending = pending;
        Some(sync)
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Consume the dispatcher, returning the emitter
    pub fn into_emitter(self) -> E {
        self.emitter
    }

    fn dispatch_event(&mut self, event: SoftEvent, sample_rate: f64, report: &mut TickReport) {
        if self.engine.is_sync_twin(&event) {
            if let Some(sync) = self.engine.on_soft_sync(event.client_seconds, sample_rate) {
                self.complete_sync(sync, report);
            }
            return;
        }

        let sample_number = match self.engine.resolve(event.client_seconds, sample_rate) {
            Ok(sample_number) => sample_number,
            Err(e) => {
                warn!(
                    kind = event.kind_name(),
                    client_seconds = event.client_seconds,
                    error = %e,
                    "Dropping soft event"
                );
                metrics::counter!(
                    "soft_events_dropped_total",
                    "kind" => event.kind_name(),
                    "reason" => e.reason()
                )
                .increment(1);
                report.unsynchronized.push(e);
                return;
            }
        };

        let kind = match event.payload {
            SoftPayload::Ttl { line, state } => StreamEventKind::Ttl { line, state },
            SoftPayload::Text(text) => StreamEventKind::Text(text),
        };
        metrics::counter!("soft_events_emitted_total", "kind" => kind.name()).increment(1);
        self.emit(sample_number, kind, report);
    }

    fn complete_sync(&mut self, sync: CompletedSync, report: &mut TickReport) {
        report.syncs_completed += 1;
        if !self.emit_sync_markers {
            return;
        }

        let kind = StreamEventKind::SyncMarker {
            local_sample_number: sync.local_sample_number,
            soft_seconds: sync.soft_seconds,
            soft_sample_zero: sync.soft_sample_zero,
        };
        let sample_number = i64::try_from(sync.local_sample_number).unwrap_or(i64::MAX);
        self.emit(sample_number, kind, report);
    }

    fn emit(&mut self, sample_number: i64, kind: StreamEventKind, report: &mut TickReport) {
        self.emitter.emit(StreamEvent {
            stream_id: self.stream_id,
            sample_number,
            kind,
        });
        report.emitted += 1;
    }
}
