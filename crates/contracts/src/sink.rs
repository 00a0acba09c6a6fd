//! Output interfaces
//!
//! [`EventEmitter`] is what the tick dispatcher writes into (synchronous, must
//! not block). [`EventSink`] is the async output interface behind a sink worker.

use crate::{ContractError, StreamEvent};

/// Receives events placed into a local stream during a tick
///
/// Implementations must return promptly; the tick runs on the host's
/// processing path.
pub trait EventEmitter {
    /// Emit one event
    fn emit(&mut self, event: StreamEvent);
}

impl EventEmitter for Vec<StreamEvent> {
    fn emit(&mut self, event: StreamEvent) {
        self.push(event);
    }
}

/// Data output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(EventSink: Send)]
pub trait LocalEventSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one stream event
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, event: &StreamEvent) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
