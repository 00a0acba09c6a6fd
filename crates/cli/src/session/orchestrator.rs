//! Session orchestrator - coordinates listener, simulated host and dispatcher.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use contracts::SessionSettings;
use dispatcher::{create_fanout, SinkFanout, TickDispatcher, TickReport};
use ingestion::{EventQueue, Listener, ListenerConfig, ListenerHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{SessionStats, SimulatedHost};

/// Listener counters are exported every this many ticks
const LISTENER_EXPORT_TICKS: u64 = 100;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Validated session settings
    pub settings: SessionSettings,

    /// Simulated stream sample rate (Hz)
    pub sample_rate: f64,

    /// Samples per tick
    pub block_size: u64,

    /// Seconds between simulated local sync pulses (<= 0 disables them)
    pub pulse_interval: f64,

    /// Maximum number of ticks (None = unlimited)
    pub max_ticks: Option<u64>,

    /// Session timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One acquisition session
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the tick limit or the timeout is reached
    ///
    /// # Errors
    /// Fails if the listener cannot bind, a sink cannot be created or the
    /// listener does not stop cleanly.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<SessionStats> {
        let start_time = Instant::now();
        let settings = &self.config.settings;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Listener
        let queue = EventQueue::new();
        let listener_config =
            ListenerConfig::from_settings(settings).context("Invalid listener settings")?;
        let listener = Listener::start(listener_config, queue.clone())
            .await
            .context("Failed to start UDP listener")?;

        info!(
            local_addr = %listener.local_addr(),
            stream_id = settings.stream_id,
            sync_line = settings.sync_line,
            sync_state = ?settings.sync_state,
            "Listening for soft events"
        );

        // Sinks
        if settings.sinks.is_empty() {
            warn!("No sinks configured - emitted events will only be counted");
        }
        let fanout = match create_fanout(&settings.sinks) {
            Ok(fanout) => fanout,
            Err(e) => {
                stop_listener(listener).await?;
                return Err(e).context("Failed to create sinks");
            }
        };

        let mut dispatcher = TickDispatcher::new(settings, queue, fanout);
        let mut host = SimulatedHost::new(
            self.config.sample_rate,
            self.config.block_size,
            settings.sync_line,
            self.config.pulse_interval,
        );

        info!(
            sample_rate = host.sample_rate(),
            block_ms = host.block_duration().as_secs_f64() * 1000.0,
            max_ticks = ?self.config.max_ticks,
            "Session running"
        );

        let mut stats = SessionStats::default();
        let mut ticker = tokio::time::interval(host.block_duration());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let (block, pulses) = host.next_block();
                    let history_before = dispatcher.engine().history().len();

                    let report = dispatcher.tick(&block, &pulses);

                    ticks += 1;
                    stats.samples_processed += block.sample_count;
                    record_report(&mut stats, &report);
                    record_new_syncs(&mut stats, &dispatcher, history_before);

                    if ticks % LISTENER_EXPORT_TICKS == 0 {
                        export_listener_totals(&listener);
                    }

                    if self.config.max_ticks.is_some_and(|max| ticks >= max) {
                        info!(ticks, "Reached max ticks limit");
                        break;
                    }
                }
                _ = &mut deadline => {
                    warn!(ticks, "Session timed out");
                    break;
                }
                _ = &mut shutdown => {
                    warn!(ticks, "Received shutdown signal, stopping session...");
                    break;
                }
            }
        }

        // Shutdown: listener first so no event is queued after the last tick
        info!("Shutting down session...");
        stats.listener = listener.metrics();
        export_listener_totals(&listener);
        let stop_result = stop_listener(listener).await;

        let remaining = dispatcher.tick(&host.next_block().0, &[]);
        record_report(&mut stats, &remaining);

        stats.history_len = dispatcher.engine().history().len();
        let fanout: SinkFanout = dispatcher.into_emitter();
        stats.sinks = fanout.metrics();
        fanout.shutdown().await;

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            emitted = stats.metrics.total_emitted,
            syncs = stats.metrics.total_syncs,
            "Session shutdown complete"
        );

        stop_result?;
        Ok(stats)
    }
}

fn record_report(stats: &mut SessionStats, report: &TickReport) {
    stats.metrics.record_tick(
        report.drained,
        report.emitted,
        report.syncs_completed,
        report.unsynchronized.len(),
    );
    observability::record_tick(report.drained, report.emitted);

    if let Some(oldest) = report.oldest_receipt_ms {
        let latency_ms = (Utc::now().timestamp_millis() - oldest) as f64;
        stats.metrics.record_latency_ms(latency_ms);
        observability::record_dispatch_latency_ms(latency_ms);
    }
}

fn record_new_syncs(
    stats: &mut SessionStats,
    dispatcher: &TickDispatcher<SinkFanout>,
    history_before: usize,
) {
    for sync in dispatcher.engine().history().iter().skip(history_before) {
        if let Some(drift) = stats.metrics.record_sync(sync.soft_sample_zero) {
            observability::record_sync_drift(drift);
            debug!(drift_samples = drift, "Sync drift since previous pairing");
        }
    }
}

fn export_listener_totals(listener: &ListenerHandle) {
    let snapshot = listener.metrics();
    observability::record_listener_totals(
        snapshot.datagrams_received,
        snapshot.decode_errors,
        snapshot.acks_sent,
    );
}

async fn stop_listener(listener: ListenerHandle) -> Result<()> {
    listener
        .stop()
        .await
        .context("UDP listener did not stop cleanly")
}
