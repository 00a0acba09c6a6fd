//! Soft events (network input), local pulses and stream events (output).

use serde::{Deserialize, Serialize};

/// Payload of a soft event received over the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftPayload {
    /// Digital line transition reported by the client
    Ttl {
        /// 0-based line index
        line: u8,
        /// Asserted (high) or not
        state: bool,
    },
    /// Free-form text message
    Text(String),
}

/// Event timestamped by the remote client's clock
///
/// Immutable once decoded. The listener stamps the local receipt time
/// before handing it to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftEvent {
    /// Timestamp from the client's point of view (seconds)
    pub client_seconds: f64,

    /// Local wall-clock receipt time (ms since Unix epoch)
    pub received_at_ms: Option<i64>,

    /// Message content
    pub payload: SoftPayload,
}

impl SoftEvent {
    /// Create a TTL soft event
    pub fn ttl(client_seconds: f64, line: u8, state: bool) -> Self {
        Self {
            client_seconds,
            received_at_ms: None,
            payload: SoftPayload::Ttl { line, state },
        }
    }

    /// Create a text soft event
    pub fn text(client_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            client_seconds,
            received_at_ms: None,
            payload: SoftPayload::Text(text.into()),
        }
    }

    /// Attach the local receipt time
    pub fn with_receipt(mut self, received_at_ms: i64) -> Self {
        self.received_at_ms = Some(received_at_ms);
        self
    }

    /// Line and state, for TTL events
    pub fn ttl_line(&self) -> Option<(u8, bool)> {
        match self.payload {
            SoftPayload::Ttl { line, state } => Some((line, state)),
            SoftPayload::Text(_) => None,
        }
    }

    /// Short name of the message kind (for logs and metric labels)
    pub fn kind_name(&self) -> &'static str {
        match self.payload {
            SoftPayload::Ttl { .. } => "ttl",
            SoftPayload::Text(_) => "text",
        }
    }
}

/// Transition detected by the host on a local digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPulse {
    /// 0-based line index
    pub line: u8,
    /// New line state
    pub state: bool,
    /// Sample number of the transition in the selected stream
    pub sample_number: u64,
}

/// One processing block of the selected stream, supplied by the host per tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickBlock {
    /// Stream sample rate (Hz)
    pub sample_rate: f64,
    /// Sample number of the first sample in this block
    pub first_sample: u64,
    /// Number of samples in this block
    pub sample_count: u64,
}

impl TickBlock {
    /// Sample number one past the end of this block
    pub fn end_sample(&self) -> u64 {
        self.first_sample + self.sample_count
    }

    /// Whether a sample number falls inside this block
    pub fn contains(&self, sample_number: u64) -> bool {
        sample_number >= self.first_sample && sample_number < self.end_sample()
    }
}

/// Event placed into a local data stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Target stream
    pub stream_id: u16,

    /// Local sample number
    pub sample_number: i64,

    /// Event content
    pub kind: StreamEventKind,
}

/// Content of an emitted stream event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    /// TTL transition from a soft event
    Ttl { line: u8, state: bool },

    /// Text from a soft event
    Text(String),

    /// A local/soft sync pairing was completed
    SyncMarker {
        local_sample_number: u64,
        soft_seconds: f64,
        soft_sample_zero: i64,
    },
}

impl StreamEventKind {
    /// Short name of the event kind (for logs and metric labels)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ttl { .. } => "ttl",
            Self::Text(_) => "text",
            Self::SyncMarker { .. } => "sync_marker",
        }
    }
}
