//! 驱动层错误类型定义

use glove_protocol::ProtocolError;
use std::io;
use thiserror::Error;

/// 数据报传输错误
#[derive(Error, Debug)]
pub enum TransportError {
    /// 接收超时（无数据，属于正常现象）
    #[error("Read timeout")]
    Timeout,

    /// socket 已关闭（接收循环的正常退出信号）
    #[error("Socket closed")]
    Closed,

    /// 其它 socket 故障
    #[error("IO Error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
            io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => TransportError::Closed,
            _ => TransportError::Io(e),
        }
    }
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// IO 错误（绑定 socket、打开日志文件）
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),

    /// 桥接已经启动
    #[error("Bridge already started")]
    AlreadyStarted,
}
