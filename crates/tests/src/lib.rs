//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 回环 UDP e2e 测试 (Listener -> EventQueue -> TickDispatcher)
//! - 配置到 sink 输出的完整链路

#[cfg(test)]
mod contract_tests {
    use contracts::wire;

    #[test]
    fn test_wire_constants() {
        assert_eq!(wire::TTL_MESSAGE_LEN, 11);
        assert_eq!(wire::ACK_LEN, 8);
        assert_eq!(wire::encode_ttl(0.0, 0, true).len(), wire::TTL_MESSAGE_LEN);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        wire, LocalPulse, SessionSettings, StreamEvent, StreamEventKind, SyncStateFilter,
        TickBlock,
    };
    use dispatcher::{create_fanout, TickDispatcher};
    use ingestion::{EventQueue, Listener, ListenerConfig, ListenerHandle};
    use sync_engine::SyncError;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    const RATE: f64 = 30000.0;

    fn settings() -> SessionSettings {
        SessionSettings {
            stream_id: 1,
            sync_line: 0,
            sync_state: SyncStateFilter::Any,
            ..Default::default()
        }
    }

    fn block(first_sample: u64) -> TickBlock {
        TickBlock {
            sample_rate: RATE,
            first_sample,
            sample_count: 1024,
        }
    }

    fn sync_pulse(sample_number: u64) -> LocalPulse {
        LocalPulse {
            line: 0,
            state: true,
            sample_number,
        }
    }

    async fn start_listener(queue: &EventQueue) -> ListenerHandle {
        let mut config = ListenerConfig::new(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)));
        config.poll_interval = Duration::from_millis(10);
        Listener::start(config, queue.clone()).await.unwrap()
    }

    async fn client(listener: &ListenerHandle) -> UdpSocket {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        socket.connect(listener.local_addr()).await.unwrap();
        socket
    }

    /// Send one datagram and wait for its acknowledgement
    ///
    /// The listener enqueues before acknowledging, so the event is in the
    /// queue once this returns.
    async fn send_acked(socket: &UdpSocket, datagram: &[u8]) -> f64 {
        socket.send(datagram).await.unwrap();
        let mut buf = [0u8; 16];
        let len = timeout(Duration::from_secs(2), socket.recv(&mut buf))
            .await
            .expect("ack timed out")
            .unwrap();
        wire::decode_ack(&buf[..len]).unwrap()
    }

    /// End-to-end: UDP client -> Listener -> EventQueue -> TickDispatcher
    ///
    /// 验证完整的数据流：
    /// 1. 本地脉冲 (3000) 与软同步 (0.2s) 配对，soft_sample_zero = -3000
    /// 2. 之后的软 TTL (0.3s) 被放置在采样 6000
    #[tokio::test]
    async fn test_e2e_loopback_alignment() {
        let queue = EventQueue::new();
        let listener = start_listener(&queue).await;
        let socket = client(&listener).await;
        let mut dispatcher = TickDispatcher::new(&settings(), queue.clone(), Vec::new());

        let receipt = send_acked(&socket, &wire::encode_ttl(0.2, 0, true)).await;
        assert!(receipt > 0.0);

        let report = dispatcher.tick(&block(2048), &[sync_pulse(3000)]);
        assert_eq!(report.syncs_completed, 1);
        assert!(report.oldest_receipt_ms.is_some());

        send_acked(&socket, &wire::encode_ttl(0.3, 5, true)).await;
        let text = wire::encode_text(0.35, "stimulus on").unwrap();
        send_acked(&socket, &text).await;

        let report = dispatcher.tick(&block(3072), &[]);
        assert_eq!(report.drained, 2);
        assert_eq!(report.emitted, 2);

        let emitted = dispatcher.into_emitter();
        assert_eq!(emitted.len(), 3);
        assert!(matches!(
            emitted[0].kind,
            StreamEventKind::SyncMarker {
                local_sample_number: 3000,
                soft_sample_zero: -3000,
                ..
            }
        ));
        assert_eq!(
            emitted[1],
            StreamEvent {
                stream_id: 1,
                sample_number: 6000,
                kind: StreamEventKind::Ttl {
                    line: 5,
                    state: true
                },
            }
        );
        assert_eq!(emitted[2].sample_number, 7500);
        assert_eq!(
            emitted[2].kind,
            StreamEventKind::Text("stimulus on".to_string())
        );

        let metrics = listener.metrics();
        assert_eq!(metrics.events_enqueued, 3);
        assert_eq!(metrics.acks_sent, 3);
        listener.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_e2e_event_before_sync_is_dropped() {
        let queue = EventQueue::new();
        let listener = start_listener(&queue).await;
        let socket = client(&listener).await;
        let mut dispatcher = TickDispatcher::new(&settings(), queue.clone(), Vec::new());

        let text = wire::encode_text(0.5, "too early").unwrap();
        send_acked(&socket, &text).await;

        let report = dispatcher.tick(&block(0), &[]);
        assert_eq!(report.drained, 1);
        assert_eq!(report.emitted, 0);
        assert_eq!(
            report.unsynchronized,
            vec![SyncError::Unsynchronized {
                client_seconds: 0.5
            }]
        );
        assert!(dispatcher.emitter().is_empty());

        listener.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_e2e_malformed_datagram_is_not_acknowledged() {
        let queue = EventQueue::new();
        let listener = start_listener(&queue).await;
        let socket = client(&listener).await;

        socket.send(&[0x09, 0x00, 0x01]).await.unwrap();
        let mut buf = [0u8; 16];
        let reply = timeout(Duration::from_millis(200), socket.recv(&mut buf)).await;
        assert!(reply.is_err(), "malformed datagram must not be acknowledged");

        // Listener keeps serving after a decode failure
        send_acked(&socket, &wire::encode_ttl(1.0, 2, false)).await;

        let metrics = listener.metrics();
        assert_eq!(metrics.decode_errors, 1);
        assert_eq!(queue.len(), 1);
        listener.stop().await.unwrap();
    }

    /// Settings file -> fanout -> FileSink 的完整链路
    #[tokio::test]
    async fn test_e2e_config_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aligned.jsonl");

        let toml = format!(
            r#"
port = 0
stream_id = 4
sync_line = 1
sync_state = "high"

[[sinks]]
name = "trace"
sink_type = "log"

[[sinks]]
name = "events"
sink_type = "file"
params = {{ path = '{}' }}
"#,
            path.display()
        );
        let settings = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let queue = EventQueue::new();
        let listener = start_listener(&queue).await;
        let socket = client(&listener).await;
        let fanout = create_fanout(&settings.sinks).unwrap();
        let mut dispatcher = TickDispatcher::new(&settings, queue.clone(), fanout);

        // Falling edge is filtered out, rising edge pairs
        let falling = LocalPulse {
            line: 1,
            state: false,
            sample_number: 100,
        };
        let rising = LocalPulse {
            line: 1,
            state: true,
            sample_number: 30000,
        };
        send_acked(&socket, &wire::encode_ttl(2.0, 1, true)).await;
        let report = dispatcher.tick(&block(29696), &[falling, rising]);
        assert_eq!(report.syncs_completed, 1);
        assert_eq!(dispatcher.engine().ignored_pulses(), 1);

        send_acked(&socket, &wire::encode_ttl(2.5, 6, true)).await;
        dispatcher.tick(&block(30720), &[]);

        listener.stop().await.unwrap();
        let fanout = dispatcher.into_emitter();
        assert_eq!(fanout.sink_count(), 2);
        fanout.shutdown().await;

        let content = std::fs::read_to_string(&path).unwrap();
        let events: Vec<StreamEvent> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.stream_id == 4));
        assert_eq!(events[0].sample_number, 30000);
        assert_eq!(events[1].sample_number, 45000);
        assert_eq!(
            events[1].kind,
            StreamEventKind::Ttl {
                line: 6,
                state: true
            }
        );
    }
}
