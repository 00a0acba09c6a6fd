//! Session orchestration module.

mod host;
mod orchestrator;
mod stats;

pub use host::SimulatedHost;
pub use orchestrator::{Session, SessionConfig};
pub use stats::SessionStats;
