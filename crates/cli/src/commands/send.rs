//! `send` command implementation - test client for a running listener.
//!
//! Each round sends a sync TTL, a text message and an on/off TTL pair on the
//! extra line, printing the receipt time acknowledged for each message.

use anyhow::{Context, Result};
use contracts::wire;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::cli::SendArgs;

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    let socket = UdpSocket::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind client socket on {}", args.bind))?;
    socket
        .connect(args.target)
        .await
        .with_context(|| format!("Failed to connect to {}", args.target))?;

    info!(
        target = %args.target,
        local = %socket.local_addr()?,
        rounds = args.rounds,
        "Sending test messages"
    );

    let client = Client {
        socket,
        start: Instant::now(),
        ack_timeout: Duration::from_millis(args.ack_timeout_ms),
    };
    let interval = Duration::from_millis(args.interval_ms);
    let mut acked = 0u32;
    let mut sent = 0u32;

    for round in 0..args.rounds {
        sleep(interval).await;

        // Alternates low/high, starting low
        let sync_state = round % 2 == 1;
        sent += 1;
        acked += client
            .send_ttl(args.sync_line, sync_state, "sync")
            .await? as u32;

        sleep(interval / 4).await;

        sent += 1;
        acked += client.send_text(&args.text).await? as u32;

        sent += 2;
        acked += client.send_ttl(args.extra_line, true, "extra on").await? as u32;
        acked += client.send_ttl(args.extra_line, false, "extra off").await? as u32;
    }

    println!("\nSent {sent} messages, {acked} acknowledged");
    info!(sent, acked, "Send finished");
    Ok(())
}

struct Client {
    socket: UdpSocket,
    start: Instant,
    ack_timeout: Duration,
}

impl Client {
    /// Client clock: seconds since the client started
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    async fn send_ttl(&self, line: u8, state: bool, label: &str) -> Result<bool> {
        let seconds = self.now();
        let datagram = wire::encode_ttl(seconds, line, state);
        self.socket
            .send(&datagram)
            .await
            .context("Failed to send TTL message")?;
        debug!(line, state, client_seconds = seconds, "TTL sent");
        self.await_ack(label, seconds).await
    }

    async fn send_text(&self, text: &str) -> Result<bool> {
        let seconds = self.now();
        let datagram = wire::encode_text(seconds, text).context("Failed to encode text message")?;
        self.socket
            .send(&datagram)
            .await
            .context("Failed to send text message")?;
        debug!(client_seconds = seconds, len = text.len(), "Text sent");
        self.await_ack("text", seconds).await
    }

    /// Wait for one acknowledgement; a missing ack is reported, not retried
    async fn await_ack(&self, label: &str, sent_seconds: f64) -> Result<bool> {
        let mut buf = [0u8; 64];
        match timeout(self.ack_timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => match wire::decode_ack(&buf[..len]) {
                Ok(receipt) => {
                    println!("{label:>9} @ {sent_seconds:>10.4}s -> received at {receipt:.3}");
                    Ok(true)
                }
                Err(e) => {
                    warn!(label, error = %e, "Malformed acknowledgement");
                    Ok(false)
                }
            },
            Ok(Err(e)) => {
                warn!(label, error = %e, "Failed to receive acknowledgement");
                Ok(false)
            }
            Err(_) => {
                warn!(label, timeout_ms = self.ack_timeout.as_millis() as u64, "No acknowledgement");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SoftPayload;
    use std::net::{Ipv4Addr, SocketAddr};

    fn args(target: SocketAddr) -> SendArgs {
        SendArgs {
            target,
            bind: "127.0.0.1:0".parse().unwrap(),
            sync_line: 0,
            extra_line: 3,
            rounds: 1,
            interval_ms: 1,
            text: "ping".to_string(),
            ack_timeout_ms: 500,
        }
    }

    #[tokio::test]
    async fn test_send_round_against_echo_server() {
        let server = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let target = server.local_addr().unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let mut received = Vec::new();
            for _ in 0..4 {
                let (len, peer) = server.recv_from(&mut buf).await.unwrap();
                received.push(wire::decode(&buf[..len]).unwrap());
                server.send_to(&wire::encode_ack(1.5), peer).await.unwrap();
            }
            received
        });

        run_send(&args(target)).await.unwrap();
        let received = responder.await.unwrap();

        assert_eq!(received.len(), 4);
        assert_eq!(received[0].ttl_line(), Some((0, false)));
        assert!(matches!(&received[1].payload, SoftPayload::Text(t) if t == "ping"));
        assert_eq!(received[2].ttl_line(), Some((3, true)));
        assert_eq!(received[3].ttl_line(), Some((3, false)));
        assert!(received[0].client_seconds <= received[3].client_seconds);
    }

    #[tokio::test]
    async fn test_sync_state_alternates_starting_low() {
        let server = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let mut args = args(server.local_addr().unwrap());
        args.rounds = 2;

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let mut sync_states = Vec::new();
            for _ in 0..8 {
                let (len, peer) = server.recv_from(&mut buf).await.unwrap();
                let event = wire::decode(&buf[..len]).unwrap();
                if let Some((0, state)) = event.ttl_line() {
                    sync_states.push(state);
                }
                server.send_to(&wire::encode_ack(1.5), peer).await.unwrap();
            }
            sync_states
        });

        run_send(&args).await.unwrap();
        assert_eq!(responder.await.unwrap(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_missing_acks_do_not_fail() {
        let silent = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let mut args = args(silent.local_addr().unwrap());
        args.ack_timeout_ms = 20;

        assert!(run_send(&args).await.is_ok());
    }
}
