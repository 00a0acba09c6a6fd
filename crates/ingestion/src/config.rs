//! Listener configuration and metrics

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::SessionSettings;

use crate::error::{ListenerError, Result};

/// Receive buffer size (largest possible UDP payload plus headroom)
pub const RECV_BUFFER_SIZE: usize = 65536;

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind (port 0 picks an ephemeral port)
    pub bind_addr: SocketAddr,

    /// Receive timeout between cancellation checks
    pub poll_interval: Duration,

    /// How long `stop()` waits before aborting the task
    pub stop_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 12345)),
            poll_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(1),
        }
    }
}

impl ListenerConfig {
    /// Create configuration for an address with default timings
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Build from session settings
    pub fn from_settings(settings: &SessionSettings) -> Result<Self> {
        let bind_addr = settings
            .bind_addr()
            .map_err(|e| ListenerError::InvalidAddress(e.to_string()))?;

        Ok(Self {
            bind_addr,
            poll_interval: settings.poll_interval(),
            stop_timeout: settings.stop_timeout(),
        })
    }
}

/// Listener metrics
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Datagrams read from the socket
    pub datagrams_received: AtomicU64,

    /// Events pushed to the queue
    pub events_enqueued: AtomicU64,

    /// Datagrams rejected by the decoder
    pub decode_errors: AtomicU64,

    /// Acknowledgements sent
    pub acks_sent: AtomicU64,

    /// Receive/send failures
    pub transport_errors: AtomicU64,
}

impl ListenerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ack(&self) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub events_enqueued: u64,
    pub decode_errors: u64,
    pub acks_sent: u64,
    pub transport_errors: u64,
}
