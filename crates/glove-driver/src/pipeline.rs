//! Pipeline IO 循环模块
//!
//! 三个后台循环：
//!
//! - [`glove_rx_loop`]：接收手套数据报，原样中继给伴随进程，非机器人来源的数据报
//!   转成十六进制后入队
//! - [`companion_rx_loop`]：接收伴随进程发回的指令并分类记录
//! - [`worker_loop`]：按 FIFO 顺序出队、解码、驱动夹爪状态机并写日志
//!
//! 所有循环在每次迭代开始时检查 `is_running`。接收超时不是错误，只是检查取消标志的
//! 时机；socket 关闭以 info 退出，其它传输故障以 error 退出，不重试。

use crate::calibration::Calibration;
use crate::error::TransportError;
use crate::grip::GripController;
use crate::metrics::BridgeMetrics;
use crate::robot::RobotLink;
use crate::transport::{DatagramSocket, RECV_BUFFER_LEN};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use glove_protocol::{PARSE_FAILED_ROW, SensorFrame, bytes_to_hex, hex_to_bytes};
use glove_tools::FrameLogWriter;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Pipeline 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 中继目标（伴随进程）
    pub companion_target: SocketAddr,
    /// 机器人控制器 IP，来自该 IP 的数据报只中继不入队
    pub robot_ip: IpAddr,
    /// 队列等待超时（worker 检查取消标志的粒度）
    pub recv_timeout: Duration,
}

/// 接收循环的退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// `is_running` 被清除
    Cancelled,
    /// socket 已关闭
    Closed,
    /// 传输故障（不重试）
    Fault,
    /// 队列接收端已释放
    QueueDisconnected,
}

/// 处理单次接收错误，返回 `Some` 表示循环应退出
fn classify_recv_error(
    name: &str,
    err: TransportError,
    metrics: &BridgeMetrics,
) -> Option<LoopExit> {
    match err {
        TransportError::Timeout => {
            metrics.recv_timeouts.fetch_add(1, Ordering::Relaxed);
            None
        },
        TransportError::Closed => {
            info!("{}: socket has been closed, exiting receive loop", name);
            Some(LoopExit::Closed)
        },
        TransportError::Io(e) => {
            error!("{}: transport error, exiting receive loop: {}", name, e);
            Some(LoopExit::Fault)
        },
    }
}

/// 手套接收循环
///
/// 每个数据报先尽力中继给伴随进程（不重试、不确认），
/// 然后若来源 IP 不是机器人，则十六进制编码后入队。
pub fn glove_rx_loop(
    glove: Arc<dyn DatagramSocket>,
    relay: Arc<dyn DatagramSocket>,
    queue: Sender<String>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<BridgeMetrics>,
) -> LoopExit {
    let mut buf = [0u8; RECV_BUFFER_LEN];

    loop {
        // Acquire: 看到 false 时必须同时看到关闭前的所有写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Glove RX thread: is_running flag is false, exiting");
            return LoopExit::Cancelled;
        }

        let (len, from) = match glove.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) => match classify_recv_error("Glove RX thread", e, &metrics) {
                Some(exit) => return exit,
                None => continue,
            },
        };
        let datagram = &buf[..len];
        metrics.datagrams_received.fetch_add(1, Ordering::Relaxed);

        match relay.send_to(datagram, config.companion_target) {
            Ok(_) => {
                metrics.datagrams_relayed.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) => {
                metrics.relay_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Could not relay datagram to {}: {}",
                    config.companion_target, e
                );
            },
        }

        if from.ip() == config.robot_ip {
            metrics.robot_echoes_skipped.fetch_add(1, Ordering::Relaxed);
            trace!("Datagram from robot {} relayed only", from);
            continue;
        }

        if queue.send(bytes_to_hex(datagram)).is_err() {
            info!("Glove RX thread: frame queue disconnected, exiting");
            return LoopExit::QueueDisconnected;
        }
        metrics.datagrams_queued.fetch_add(1, Ordering::Relaxed);
    }
}

/// 伴随进程发回的指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanionCommand {
    /// `A1 B2 C3`
    Command1,
    /// `D4 E5 F6`
    Command2,
    /// 未知指令（原始十六进制）
    Unknown(String),
}

impl CompanionCommand {
    pub const COMMAND1_HEX: &'static str = "A1 B2 C3";
    pub const COMMAND2_HEX: &'static str = "D4 E5 F6";

    /// 按十六进制文本分类（精确匹配）
    pub fn classify(hex: &str) -> Self {
        match hex {
            Self::COMMAND1_HEX => Self::Command1,
            Self::COMMAND2_HEX => Self::Command2,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// 伴随进程接收循环
///
/// 指令只做分类与记录，不触发机器人动作。
pub fn companion_rx_loop(
    socket: Arc<dyn DatagramSocket>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<BridgeMetrics>,
) -> LoopExit {
    let mut buf = [0u8; RECV_BUFFER_LEN];

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Companion RX thread: is_running flag is false, exiting");
            return LoopExit::Cancelled;
        }

        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) => match classify_recv_error("Companion RX thread", e, &metrics) {
                Some(exit) => return exit,
                None => continue,
            },
        };

        let hex = bytes_to_hex(&buf[..len]);
        trace!("{} sent companion data: {}", from, hex);
        match CompanionCommand::classify(&hex) {
            CompanionCommand::Unknown(hex) => {
                warn!("Received unknown companion command from {}: {}", from, hex);
            },
            known => {
                info!("Executing companion {:?} from {}", known, from);
            },
        }
    }
}

/// 帧处理器（worker 线程的单步逻辑）
///
/// 解码 → 夹爪控制 → 写日志。解码失败写 `Parse failed`，不会中断流水线。
pub struct FrameWorker {
    grip: Arc<GripController>,
    calibration: Arc<Calibration>,
    robot: RobotLink,
    frame_log: Arc<FrameLogWriter>,
    metrics: Arc<BridgeMetrics>,
}

impl FrameWorker {
    pub fn new(
        grip: Arc<GripController>,
        calibration: Arc<Calibration>,
        robot: RobotLink,
        frame_log: Arc<FrameLogWriter>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            grip,
            calibration,
            robot,
            frame_log,
            metrics,
        }
    }

    /// 处理一个出队的十六进制数据报
    pub fn process(&self, hex: &str) {
        let bytes = hex_to_bytes(hex);
        let row = match SensorFrame::decode(&bytes) {
            Ok(frame) => {
                self.metrics.frames_decoded.fetch_add(1, Ordering::Relaxed);
                if let Some(command) = self.grip.update(frame.channel_mean(), &self.calibration) {
                    self.robot.send_logged(&command);
                }
                frame.to_log_row()
            },
            Err(e) => {
                self.metrics.frames_malformed.fetch_add(1, Ordering::Relaxed);
                warn!("Data packet cannot be parsed: {}", e);
                PARSE_FAILED_ROW.to_string()
            },
        };

        if !self.frame_log.append(hex, &row) {
            self.metrics.rows_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Worker 循环
///
/// 阻塞等待队列（`recv_timeout`），入队即唤醒；超时只用于检查取消标志。
/// 取消时先处理完队列中已有的数据报再退出，接收线程收到的每一帧都会落盘。
pub fn worker_loop(
    queue: Receiver<String>,
    worker: FrameWorker,
    recv_timeout: Duration,
    is_running: Arc<AtomicBool>,
) -> LoopExit {
    loop {
        if !is_running.load(Ordering::Acquire) {
            let drained = queue.try_iter().map(|hex| worker.process(&hex)).count();
            if drained > 0 {
                debug!("Worker thread: drained {} queued datagrams before exit", drained);
            }
            trace!("Worker thread: is_running flag is false, exiting");
            return LoopExit::Cancelled;
        }

        match queue.recv_timeout(recv_timeout) {
            Ok(hex) => worker.process(&hex),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Worker thread: frame queue disconnected, exiting");
                return LoopExit::QueueDisconnected;
            },
        }
    }
}
