//! Builder 模式实现
//!
//! 提供链式构造 [`Bridge`] 实例的便捷方式。未显式提供的 socket 和日志写入器
//! 按配置创建。

use crate::bridge::Bridge;
use crate::error::DriverError;
use crate::transport::{DatagramSocket, bind_udp};
use glove_tools::{BridgeConfig, FrameLogWriter};
use std::io;
use std::sync::Arc;

/// Bridge Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use glove_driver::BridgeBuilder;
/// use glove_tools::BridgeConfig;
///
/// let mut bridge = BridgeBuilder::new()
///     .config(BridgeConfig::default())
///     .build()
///     .unwrap();
/// bridge.start().unwrap();
/// ```
#[derive(Default)]
pub struct BridgeBuilder {
    config: BridgeConfig,
    glove_socket: Option<Arc<dyn DatagramSocket>>,
    companion_socket: Option<Arc<dyn DatagramSocket>>,
    frame_log: Option<FrameLogWriter>,
}

impl BridgeBuilder {
    /// 创建新的 Builder（默认配置）
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置桥接配置
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// 使用已有的手套 socket（默认绑定 `glove_bind`）
    pub fn glove_socket(mut self, socket: Arc<dyn DatagramSocket>) -> Self {
        self.glove_socket = Some(socket);
        self
    }

    /// 使用已有的伴随 socket（默认绑定 `companion_bind`）
    pub fn companion_socket(mut self, socket: Arc<dyn DatagramSocket>) -> Self {
        self.companion_socket = Some(socket);
        self
    }

    /// 使用已有的日志写入器（默认在 `log_dir` 下创建）
    pub fn frame_log(mut self, frame_log: FrameLogWriter) -> Self {
        self.frame_log = Some(frame_log);
        self
    }

    /// 构建 Bridge（尚未启动线程）
    pub fn build(self) -> Result<Bridge, DriverError> {
        let config = self.config;
        let timeout = config.recv_timeout();

        let glove_socket = match self.glove_socket {
            Some(socket) => socket,
            None => Arc::new(bind_udp(config.glove_bind, timeout)?),
        };
        let companion_socket = match self.companion_socket {
            Some(socket) => socket,
            None => Arc::new(bind_udp(config.companion_bind, timeout)?),
        };
        let frame_log = match self.frame_log {
            Some(frame_log) => frame_log,
            None => FrameLogWriter::create(&config.log_dir, &config.log_base_name)
                .map_err(|e| DriverError::Io(io::Error::other(format!("{e:#}"))))?,
        };

        Ok(Bridge::new(config, glove_socket, companion_socket, frame_log))
    }
}
