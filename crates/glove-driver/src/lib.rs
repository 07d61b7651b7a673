//! 驱动层模块
//!
//! 手套遥测桥接的线程与共享状态：
//! - 手套 / 伴随进程两个接收循环，worker 循环（crossbeam 无界队列）
//! - 夹爪滞回控制状态机
//! - 跟踪样本的一次性零点标定与坐标变换
//! - 机器人指令发送

mod bridge;
mod builder;
pub mod calibration;
mod error;
pub mod grip;
pub mod metrics;
pub mod pipeline;
pub mod robot;
pub mod transport;

pub use bridge::Bridge;
pub use builder::BridgeBuilder;
pub use calibration::{Calibration, CalibrationOffset, TrackedSample, coord_command};
pub use error::{DriverError, TransportError};
pub use grip::{AtomicGripState, GripController, GripState};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use pipeline::{
    CompanionCommand, FrameWorker, LoopExit, PipelineConfig, companion_rx_loop, glove_rx_loop,
    worker_loop,
};
pub use robot::RobotLink;
pub use transport::{DatagramSocket, bind_udp};
