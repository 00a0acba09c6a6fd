//! Sync engine error types

use thiserror::Error;

/// Sync-specific errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// No completed sync estimate applies to this soft timestamp
    #[error("no sync estimate applies to soft time {client_seconds}s")]
    Unsynchronized { client_seconds: f64 },

    /// The applicable sync maps this soft timestamp outside the sample range
    #[error("soft time {client_seconds}s maps outside the local sample range")]
    OutOfRange { client_seconds: f64 },
}

impl SyncError {
    /// Short reason label (for metrics)
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unsynchronized { .. } => "unsynchronized",
            Self::OutOfRange { .. } => "out_of_range",
        }
    }
}
