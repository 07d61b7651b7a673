//! 机器人指令发送
//!
//! 指令从手套 socket 发出。夹爪指令（worker 线程）与坐标指令（跟踪线程）
//! 共用同一个 socket，每条指令是一个独立的 UDP 数据报，不需要额外加锁。

use crate::error::TransportError;
use crate::metrics::BridgeMetrics;
use crate::transport::DatagramSocket;
use glove_protocol::HexFrame;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

/// 机器人控制链路
#[derive(Clone)]
pub struct RobotLink {
    socket: Arc<dyn DatagramSocket>,
    robot_addr: SocketAddr,
    metrics: Arc<BridgeMetrics>,
}

impl RobotLink {
    pub fn new(
        socket: Arc<dyn DatagramSocket>,
        robot_addr: SocketAddr,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            socket,
            robot_addr,
            metrics,
        }
    }

    /// 机器人控制器地址
    pub fn robot_addr(&self) -> SocketAddr {
        self.robot_addr
    }

    /// 发送一条指令
    pub fn send<C: HexFrame + ?Sized>(&self, command: &C) -> Result<(), TransportError> {
        let bytes = command.encode();
        match self.socket.send_to(&bytes, self.robot_addr) {
            Ok(_) => {
                self.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
                debug!("Robot command sent: {}", command.to_hex_string());
                Ok(())
            },
            Err(e) => {
                self.metrics.command_send_failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            },
        }
    }

    /// 发送指令，失败只记录日志
    pub fn send_logged<C: HexFrame + ?Sized>(&self, command: &C) -> bool {
        match self.send(command) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to send {:?} command to {}: {}",
                    command.opcode(), self.robot_addr, e
                );
                false
            },
        }
    }
}
