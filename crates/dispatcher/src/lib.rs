//! # Dispatcher
//!
//! 软事件分发模块。
//!
//! 负责：
//! - 每个处理周期 (tick) 先投递本地同步脉冲，再排空事件队列
//! - 通过同步历史把软时间戳映射为本地采样序号
//! - 将 `StreamEvent` 写入选定数据流，并 fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞 tick

pub mod error;
pub mod fanout;
pub mod handle;
pub mod metrics;
pub mod sinks;
pub mod tick;

pub use contracts::{EventEmitter, EventSink, StreamEvent};
pub use error::DispatcherError;
pub use fanout::{create_fanout, SinkFanout};
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink};
pub use tick::{TickDispatcher, TickReport};
