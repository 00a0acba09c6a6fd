//! Listener 错误类型

use std::net::SocketAddr;

use thiserror::Error;

/// Listener 错误
///
/// 只有这些错误会返回给会话层；接收循环内部的传输错误仅记录日志与计数。
#[derive(Debug, Error)]
pub enum ListenerError {
    /// 绑定 UDP 地址失败
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        /// 目标地址
        addr: SocketAddr,
        /// 底层 IO 错误
        #[source]
        source: std::io::Error,
    },

    /// 监听地址无效
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    /// 接收任务未在超时内退出，已强制中止
    #[error("listener did not stop within {waited_ms} ms and was aborted")]
    ShutdownTimeout {
        /// 已等待时长 (ms)
        waited_ms: u64,
    },

    /// 接收任务异常退出
    #[error("listener task failed: {message}")]
    TaskFailed {
        /// 错误消息
        message: String,
    },
}

/// Listener Result 类型别名
pub type Result<T> = std::result::Result<T, ListenerError>;
