//! SessionSettings - Config Loader output
//!
//! Editable settings of one acquisition session: bind address, target stream,
//! sync line selection and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::ContractError;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Address to bind the UDP listener to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the UDP listener to (0 = ephemeral)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Stream that receives the aligned events
    #[serde(default)]
    pub stream_id: u16,

    /// 0-based digital line used for sync pairing
    #[serde(default)]
    pub sync_line: u8,

    /// Which transitions on the sync line count as sync pulses
    #[serde(default)]
    pub sync_state: SyncStateFilter,

    /// Emit a marker event each time a sync pairing completes
    #[serde(default = "default_emit_sync_markers")]
    pub emit_sync_markers: bool,

    /// Listener poll timeout (ms), bounds cancellation latency
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long stop waits for the listener to exit (ms)
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    12345
}

fn default_emit_sync_markers() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_stop_timeout_ms() -> u64 {
    1000
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            host: default_host(),
            port: default_port(),
            stream_id: 0,
            sync_line: 0,
            sync_state: SyncStateFilter::Any,
            emit_sync_markers: default_emit_sync_markers(),
            poll_interval_ms: default_poll_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            sinks: Vec::new(),
        }
    }
}

impl SessionSettings {
    /// Resolve `host:port` into a socket address
    ///
    /// # Errors
    /// Returns a validation error if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ContractError> {
        let ip: IpAddr = self.host.parse().map_err(|e| {
            ContractError::config_validation("host", format!("invalid ip '{}': {e}", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Listener poll timeout
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Listener stop deadline
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Sync line state filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStateFilter {
    /// Rising and falling transitions
    #[default]
    Any,
    /// Rising transitions only
    High,
    /// Falling transitions only
    Low,
}

impl SyncStateFilter {
    /// Whether a line state passes this filter
    pub fn accepts(self, state: bool) -> bool {
        match self {
            Self::Any => true,
            Self::High => state,
            Self::Low => !state,
        }
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSON-lines file output
    File,
}
