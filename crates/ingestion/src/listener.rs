//! UDP listener task

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contracts::wire;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ListenerConfig, ListenerMetrics, MetricsSnapshot, RECV_BUFFER_SIZE};
use crate::error::{ListenerError, Result};
use crate::queue::EventQueue;

/// Session UDP listener
pub struct Listener;

impl Listener {
    /// Bind the socket and spawn the receive loop
    ///
    /// # Errors
    /// `Bind` if the address cannot be bound. No task is started in that case.
    #[instrument(name = "listener_start", skip(config, queue), fields(addr = %config.bind_addr))]
    pub async fn start(config: ListenerConfig, queue: EventQueue) -> Result<ListenerHandle> {
        let addr = config.bind_addr;
        let socket = UdpSocket::bind(addr).await.map_err(|source| {
            error!(addr = %addr, error = %source, "Failed to bind UDP socket");
            ListenerError::Bind { addr, source }
        })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        let cancel = Arc::new(AtomicBool::new(false));
        let metrics = Arc::new(ListenerMetrics::new());

        let task = tokio::spawn(receive_loop(
            socket,
            queue,
            metrics.clone(),
            cancel.clone(),
            config.poll_interval,
        ));

        info!(
            local_addr = %local_addr,
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            "UDP listener started"
        );

        Ok(ListenerHandle {
            local_addr,
            cancel,
            metrics,
            task: Some(task),
            stop_timeout: config.stop_timeout,
        })
    }
}

/// Handle to a running listener
///
/// Dropping the handle requests cancellation without waiting.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    cancel: Arc<AtomicBool>,
    metrics: Arc<ListenerMetrics>,
    task: Option<JoinHandle<()>>,
    stop_timeout: Duration,
}

impl ListenerHandle {
    /// Address the socket is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current listener counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether the receive loop is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the receive loop and release the socket
    ///
    /// Waits up to the stop timeout for the loop to observe cancellation, then
    /// aborts it.
    #[instrument(name = "listener_stop", skip(self), fields(addr = %self.local_addr))]
    pub async fn stop(mut self) -> Result<()> {
        self.cancel.store(true, Ordering::SeqCst);

        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.stop_timeout, &mut task).await {
            Ok(Ok(())) => {
                info!(stats = ?self.metrics.snapshot(), "UDP listener stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "UDP listener task failed");
                Err(ListenerError::TaskFailed {
                    message: e.to_string(),
                })
            }
            Err(_) => {
                task.abort();
                let waited_ms = self.stop_timeout.as_millis() as u64;
                warn!(waited_ms, "UDP listener did not stop in time, aborted");
                Err(ListenerError::ShutdownTimeout { waited_ms })
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

async fn receive_loop(
    socket: UdpSocket,
    queue: EventQueue,
    metrics: Arc<ListenerMetrics>,
    cancel: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    while !cancel.load(Ordering::SeqCst) {
        match tokio::time::timeout(poll_interval, socket.recv_from(&mut buf)).await {
            // Poll timeout, re-check cancellation
            Err(_) => continue,
            Ok(Err(e)) => {
                metrics.record_transport_error();
                metrics::counter!("udp_transport_errors_total", "op" => "recv").increment(1);
                warn!(error = %e, "UDP receive failed");
            }
            Ok(Ok((len, peer))) => {
                handle_datagram(&socket, &buf[..len], peer, &queue, &metrics).await;
            }
        }
    }

    debug!("UDP receive loop exited");
}

/// Decode, stamp, enqueue and acknowledge one datagram
async fn handle_datagram(
    socket: &UdpSocket,
    datagram: &[u8],
    peer: SocketAddr,
    queue: &EventQueue,
    metrics: &ListenerMetrics,
) {
    metrics.record_received();
    metrics::counter!("udp_datagrams_received_total").increment(1);

    let event = match wire::decode(datagram) {
        Ok(event) => event,
        Err(e) => {
            metrics.record_decode_error();
            metrics::counter!("udp_decode_errors_total", "reason" => e.reason()).increment(1);
            warn!(peer = %peer, len = datagram.len(), error = %e, "Dropping malformed datagram");
            return;
        }
    };

    let received_at_ms = Utc::now().timestamp_millis();
    debug!(
        peer = %peer,
        kind = event.kind_name(),
        client_seconds = event.client_seconds,
        received_at_ms,
        "Soft event received"
    );

    queue.push(event.with_receipt(received_at_ms));
    metrics.record_enqueued();

    let ack = wire::encode_ack(received_at_ms as f64 / 1000.0);
    match socket.send_to(&ack, peer).await {
        Ok(_) => metrics.record_ack(),
        Err(e) => {
            metrics.record_transport_error();
            metrics::counter!("udp_transport_errors_total", "op" => "send").increment(1);
            warn!(peer = %peer, error = %e, "Failed to send acknowledgement");
        }
    }
}
