//! # Sync Engine
//!
//! 本地采样时钟与远端软时钟的对齐引擎。
//!
//! 负责：
//! - 将一个本地同步脉冲与一个软同步时间戳配对
//! - 生成线性映射：软时钟秒数 -> 本地采样序号
//! - 保存已完成映射的历史，供之后的软事件查询
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{SyncEngine, SyncFilter};
//!
//! let mut engine = SyncEngine::new(SyncFilter::new(2, SyncStateFilter::Any));
//!
//! // Host detected a real pulse on the sync line
//! engine.on_local_pulse(&pulse, 30000.0);
//!
//! // Client reported the same pulse from its own clock
//! if let Some(sync) = engine.on_soft_sync(0.2, 30000.0) {
//!     // Later soft timestamps can now be placed
//!     let sample = engine.resolve(0.3, 30000.0)?;
//! }
//! ```

mod engine;
mod error;
mod estimate;
mod filter;
mod history;

pub use engine::SyncEngine;
pub use error::SyncError;
pub use estimate::{CompletedSync, EstimateState, SyncEstimate};
pub use filter::SyncFilter;
pub use history::SyncHistory;

// Re-export contracts types
pub use contracts::{LocalPulse, SoftEvent, SyncStateFilter};
