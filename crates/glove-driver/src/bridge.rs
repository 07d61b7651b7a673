//! Bridge API 模块
//!
//! 对外的 [`Bridge`] 结构体，持有三个后台线程与共享状态。

use crate::calibration::{Calibration, CalibrationOffset, TrackedSample, coord_command};
use crate::error::DriverError;
use crate::grip::{GripController, GripState};
use crate::metrics::{BridgeMetrics, MetricsSnapshot};
use crate::pipeline::{
    FrameWorker, PipelineConfig, companion_rx_loop, glove_rx_loop, worker_loop,
};
use crate::robot::RobotLink;
use crate::transport::DatagramSocket;
use glove_protocol::RobotCommand;
use glove_tools::{BridgeConfig, FrameLogWriter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{error, info, trace};

/// 手套遥测桥接（对外 API）
///
/// 由 [`BridgeBuilder`](crate::BridgeBuilder) 构建，调用 [`start`](Self::start) 后
/// 启动手套接收、伴随接收和 worker 三个线程。Drop 时自动执行 [`shutdown`](Self::shutdown)。
pub struct Bridge {
    config: BridgeConfig,
    glove_socket: Arc<dyn DatagramSocket>,
    companion_socket: Arc<dyn DatagramSocket>,
    robot: RobotLink,
    grip: Arc<GripController>,
    calibration: Arc<Calibration>,
    frame_log: Arc<FrameLogWriter>,
    metrics: Arc<BridgeMetrics>,
    /// 运行标志（所有循环在迭代开始时检查）
    is_running: Arc<AtomicBool>,
    glove_thread: Option<JoinHandle<()>>,
    companion_thread: Option<JoinHandle<()>>,
    worker_thread: Option<JoinHandle<()>>,
    started: bool,
    stopped: bool,
}

impl Bridge {
    pub(crate) fn new(
        config: BridgeConfig,
        glove_socket: Arc<dyn DatagramSocket>,
        companion_socket: Arc<dyn DatagramSocket>,
        frame_log: FrameLogWriter,
    ) -> Self {
        let metrics = Arc::new(BridgeMetrics::new());
        let robot = RobotLink::new(glove_socket.clone(), config.robot_addr, metrics.clone());
        Self {
            config,
            glove_socket,
            companion_socket,
            robot,
            grip: Arc::new(GripController::new()),
            calibration: Arc::new(Calibration::new()),
            frame_log: Arc::new(frame_log),
            metrics,
            is_running: Arc::new(AtomicBool::new(false)),
            glove_thread: None,
            companion_thread: None,
            worker_thread: None,
            started: false,
            stopped: false,
        }
    }

    /// 启动后台线程
    ///
    /// 若配置了 `send_init_on_start`，在线程启动前发送一次 Init。
    /// 每个 `Bridge` 只能启动一次。
    pub fn start(&mut self) -> Result<(), DriverError> {
        if self.started {
            return Err(DriverError::AlreadyStarted);
        }
        self.started = true;

        if self.config.send_init_on_start {
            self.robot.send_logged(&RobotCommand::init());
        }

        // Release: 线程看到 true 时，之前的初始化写入都可见
        self.is_running.store(true, Ordering::Release);

        let (queue_tx, queue_rx) = crossbeam_channel::unbounded::<String>();
        let pipeline_config = PipelineConfig {
            companion_target: self.config.companion_target,
            robot_ip: self.config.robot_addr.ip(),
            recv_timeout: self.config.recv_timeout(),
        };

        let glove = self.glove_socket.clone();
        let relay = self.companion_socket.clone();
        let is_running = self.is_running.clone();
        let metrics = self.metrics.clone();
        let config = pipeline_config.clone();
        self.glove_thread = Some(self.spawn("glove-rx", move || {
            let exit = glove_rx_loop(glove, relay, queue_tx, config, is_running, metrics);
            trace!("Glove RX thread finished: {:?}", exit);
        })?);

        let companion = self.companion_socket.clone();
        let is_running = self.is_running.clone();
        let metrics = self.metrics.clone();
        self.companion_thread = Some(self.spawn("companion-rx", move || {
            let exit = companion_rx_loop(companion, is_running, metrics);
            trace!("Companion RX thread finished: {:?}", exit);
        })?);

        let worker = FrameWorker::new(
            self.grip.clone(),
            self.calibration.clone(),
            self.robot.clone(),
            self.frame_log.clone(),
            self.metrics.clone(),
        );
        let is_running = self.is_running.clone();
        let recv_timeout = pipeline_config.recv_timeout;
        self.worker_thread = Some(self.spawn("frame-worker", move || {
            let exit = worker_loop(queue_rx, worker, recv_timeout, is_running);
            trace!("Worker thread finished: {:?}", exit);
        })?);

        info!(
            "Bridge started: glove={}, companion={} -> {}, robot={}",
            self.config.glove_bind,
            self.config.companion_bind,
            self.config.companion_target,
            self.config.robot_addr
        );
        Ok(())
    }

    fn spawn<F>(&self, name: &str, f: F) -> Result<JoinHandle<()>, DriverError>
    where
        F: FnOnce() + Send + 'static,
    {
        thread::Builder::new().name(name.to_string()).spawn(f).map_err(|e| {
            self.is_running.store(false, Ordering::Release);
            DriverError::ThreadSpawn(format!("{}: {}", name, e))
        })
    }

    /// 提交一个跟踪样本
    ///
    /// 未被跟踪的样本直接丢弃；否则经标定变换后发送坐标指令。
    /// 可从跟踪服务自己的线程调用。
    pub fn submit_sample(&self, sample: &TrackedSample) -> Result<(), DriverError> {
        if !sample.tracked {
            trace!("Body {} not tracked, sample dropped", sample.id);
            return Ok(());
        }
        let robot = self
            .calibration
            .transform(sample, self.config.robot_base.as_array());
        self.robot.send(&coord_command(robot))?;
        Ok(())
    }

    /// 停止后台线程
    ///
    /// 清除运行标志并等待线程退出（每个线程在一个接收超时内醒来），
    /// 然后按配置发送 Shutdown。重复调用无副作用。
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        // Release: 所有之前的写入对看到 false 的线程可见
        self.is_running.store(false, Ordering::Release);

        for (name, handle) in [
            ("Glove RX", self.glove_thread.take()),
            ("Companion RX", self.companion_thread.take()),
            ("Worker", self.worker_thread.take()),
        ] {
            if let Some(handle) = handle
                && handle.join().is_err()
            {
                error!("{} thread panicked", name);
            }
        }

        if self.started && self.config.send_shutdown_on_exit {
            self.robot.send_logged(&RobotCommand::shutdown());
        }
        info!("Bridge stopped");
    }

    /// 后台线程是否在运行
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 当前夹爪状态
    pub fn grip_state(&self) -> GripState {
        self.grip.state()
    }

    /// 当前标定偏移
    pub fn calibration_offset(&self) -> CalibrationOffset {
        self.calibration.offset()
    }

    /// 指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 帧日志
    pub fn frame_log(&self) -> &FrameLogWriter {
        &self.frame_log
    }

    /// 生效的配置
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
