//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Soft events carry the remote client's clock (seconds, f64)
//! - The local timeline is a sample number of the selected data stream
//! - Receipt time is local wall-clock milliseconds, used for diagnostics only

mod error;
mod event;
mod settings;
mod sink;
pub mod wire;

pub use error::*;
pub use event::*;
pub use settings::*;
pub use sink::*;
pub use wire::{DecodeError, EncodeError};
