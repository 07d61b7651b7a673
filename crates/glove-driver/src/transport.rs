//! 数据报传输抽象
//!
//! 接收循环只依赖 [`DatagramSocket`] trait，真实部署使用 `std::net::UdpSocket`，
//! 测试使用内存中的 mock。所有方法都取 `&self`，同一个 socket 可以被接收线程
//! 与指令发送方（worker 线程、跟踪线程）共享。

use crate::error::{DriverError, TransportError};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// 单个接收缓冲区大小（手套帧为 68 字节）
pub const RECV_BUFFER_LEN: usize = 1024;

/// 数据报 socket
pub trait DatagramSocket: Send + Sync {
    /// 发送一个数据报
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, TransportError>;

    /// 接收一个数据报
    ///
    /// 超时返回 [`TransportError::Timeout`]，调用方借此检查取消标志。
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError>;
}

impl DatagramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, TransportError> {
        UdpSocket::send_to(self, buf, target).map_err(TransportError::from)
    }

    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        UdpSocket::recv_from(self, buf).map_err(TransportError::from)
    }
}

/// 绑定 UDP socket 并设置接收超时
///
/// `recv_timeout` 必须非零，否则接收循环无法观察到取消标志。
pub fn bind_udp(addr: SocketAddr, recv_timeout: Duration) -> Result<UdpSocket, DriverError> {
    let socket = UdpSocket::bind(addr)?;
    socket.set_read_timeout(Some(recv_timeout))?;
    debug!("UDP socket bound to {} (recv timeout {:?})", addr, recv_timeout);
    Ok(socket)
}
