//! 跟踪样本输入
//!
//! 跟踪服务以 JSON 数据报推送刚体位置（米）：
//!
//! ```json
//! {"id": 1, "tracked": true, "x": 0.12, "y": -0.03, "z": 0.45}
//! ```
//!
//! 未被跟踪的样本在 [`Bridge::submit_sample`] 中丢弃，格式错误的数据报记录警告后丢弃。

use glove_driver::{Bridge, DatagramSocket, TrackedSample, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, trace, warn};

/// 解析一个 JSON 跟踪样本
pub fn parse_sample(data: &[u8]) -> Result<TrackedSample, serde_json::Error> {
    serde_json::from_slice(data)
}

/// 跟踪样本接收循环
///
/// 与手套接收循环相同的取消与错误策略：超时继续，关闭或故障退出。
pub fn tracking_loop(socket: &dyn DatagramSocket, bridge: &Bridge, stop: &AtomicBool) {
    let mut buf = [0u8; 2048];

    loop {
        if stop.load(Ordering::Acquire) {
            trace!("Tracking thread: stop requested, exiting");
            return;
        }

        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(TransportError::Timeout) => continue,
            Err(TransportError::Closed) => {
                info!("Tracking socket has been closed, exiting receive loop");
                return;
            },
            Err(TransportError::Io(e)) => {
                error!("Tracking socket error, exiting receive loop: {}", e);
                return;
            },
        };

        let sample = match parse_sample(&buf[..len]) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Malformed tracking sample from {}: {}", from, e);
                continue;
            },
        };

        if let Err(e) = bridge.submit_sample(&sample) {
            warn!("Failed to forward body {} to robot: {}", sample.id, e);
        }
    }
}
