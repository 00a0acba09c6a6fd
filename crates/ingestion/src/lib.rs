//! # Ingestion
//!
//! UDP soft-event ingestion module.
//!
//! Responsibilities:
//! - Own the session's UDP socket
//! - Decode datagrams into `SoftEvent` and stamp the receipt time
//! - Push events into the shared `EventQueue`
//! - Acknowledge every accepted datagram with the receipt time
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{EventQueue, Listener, ListenerConfig};
//!
//! let queue = EventQueue::new();
//! let handle = Listener::start(ListenerConfig::from_settings(&settings)?, queue.clone()).await?;
//!
//! // On every processing tick
//! for event in queue.drain() {
//!     // Resolve and emit
//! }
//!
//! handle.stop().await?;
//! ```

mod config;
mod error;
mod listener;
mod queue;

// Re-exports
pub use config::{ListenerConfig, ListenerMetrics, MetricsSnapshot, RECV_BUFFER_SIZE};
pub use contracts::SoftEvent;
pub use error::{ListenerError, Result};
pub use listener::{Listener, ListenerHandle};
pub use queue::EventQueue;
