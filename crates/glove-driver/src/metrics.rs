//! 桥接运行指标
//!
//! 原子计数器，任何线程都可以无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 桥接实时指标
///
/// # 使用示例
///
/// ```rust
/// use glove_driver::BridgeMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = BridgeMetrics::default();
/// metrics.datagrams_received.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.datagrams_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// 手套 socket 收到的数据报总数（包括机器人回显）
    pub datagrams_received: AtomicU64,

    /// 成功中继给伴随进程的数据报数
    pub datagrams_relayed: AtomicU64,

    /// 中继发送失败次数（尽力而为，不重试）
    pub relay_failures: AtomicU64,

    /// 入队数据报数
    pub datagrams_queued: AtomicU64,

    /// 来源为机器人地址、只中继不入队的数据报数
    pub robot_echoes_skipped: AtomicU64,

    /// 解码成功的帧数
    pub frames_decoded: AtomicU64,

    /// 解码失败的帧数（写入 `Parse failed`）
    pub frames_malformed: AtomicU64,

    /// 发送给机器人的指令数
    pub commands_sent: AtomicU64,

    /// 机器人指令发送失败次数
    pub command_send_failures: AtomicU64,

    /// 日志写入失败而丢弃的行数
    pub rows_dropped: AtomicU64,

    /// 接收超时次数（空闲时的正常现象）
    pub recv_timeouts: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_relayed: self.datagrams_relayed.load(Ordering::Relaxed),
            relay_failures: self.relay_failures.load(Ordering::Relaxed),
            datagrams_queued: self.datagrams_queued.load(Ordering::Relaxed),
            robot_echoes_skipped: self.robot_echoes_skipped.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            command_send_failures: self.command_send_failures.load(Ordering::Relaxed),
            rows_dropped: self.rows_dropped.load(Ordering::Relaxed),
            recv_timeouts: self.recv_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub datagrams_relayed: u64,
    pub relay_failures: u64,
    pub datagrams_queued: u64,
    pub robot_echoes_skipped: u64,
    pub frames_decoded: u64,
    pub frames_malformed: u64,
    pub commands_sent: u64,
    pub command_send_failures: u64,
    pub rows_dropped: u64,
    pub recv_timeouts: u64,
}

impl MetricsSnapshot {
    /// 解码失败率（百分比）
    ///
    /// 尚未处理任何帧时返回 0.0。
    pub fn malformed_rate(&self) -> f64 {
        let total = self.frames_decoded + self.frames_malformed;
        if total == 0 {
            return 0.0;
        }
        (self.frames_malformed as f64 / total as f64) * 100.0
    }
}
