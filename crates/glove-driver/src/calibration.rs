//! 标定与坐标变换
//!
//! 跟踪服务给出的位置（米）先截断为整数毫米，再减去零点、加上机器人基准点，
//! 得到机器人坐标系下的坐标。
//!
//! 零点由夹爪闭合事件"预约"（[`Calibration::arm`]），在下一个跟踪样本到达时
//! 捕获一次，之后的样本不会再次捕获，直到下一次闭合。
//!
//! 预约（worker 线程）与捕获（跟踪线程）跨线程发生，共享状态由一把互斥锁保护。

use glove_protocol::{CoordCommand, coord_fits_field};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// 跟踪样本（单个刚体的一帧位置）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackedSample {
    /// 刚体 ID
    pub id: u32,
    /// 本帧是否被跟踪到
    pub tracked: bool,
    /// X（米）
    pub x: f64,
    /// Y（米）
    pub y: f64,
    /// Z（米）
    pub z: f64,
}

impl TrackedSample {
    /// 转换为整数毫米（向零截断）
    pub fn to_millimeters(&self) -> [i32; 3] {
        [meters_to_mm(self.x), meters_to_mm(self.y), meters_to_mm(self.z)]
    }
}

/// 米 → 毫米，向零截断；超出 i32 范围时饱和
pub fn meters_to_mm(value: f64) -> i32 {
    (value * 1000.0).trunc() as i32
}

/// 标定偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationOffset {
    pub x0: i32,
    pub y0: i32,
    pub z0: i32,
    /// 是否等待捕获零点
    pub pending: bool,
}

impl CalibrationOffset {
    pub fn as_array(&self) -> [i32; 3] {
        [self.x0, self.y0, self.z0]
    }
}

/// 共享标定状态
#[derive(Debug, Default)]
pub struct Calibration {
    inner: Mutex<CalibrationOffset>,
}

impl Calibration {
    /// 初始状态：偏移为 0，未预约
    pub fn new() -> Self {
        Self::default()
    }

    /// 预约一次零点捕获
    ///
    /// 返回 `true` 表示本次调用从未预约变为已预约。
    pub fn arm(&self) -> bool {
        let mut offset = self.inner.lock();
        if offset.pending {
            return false;
        }
        offset.pending = true;
        true
    }

    /// 是否等待捕获零点
    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending
    }

    /// 当前偏移
    pub fn offset(&self) -> CalibrationOffset {
        *self.inner.lock()
    }

    /// 将样本变换到机器人坐标系（mm）
    ///
    /// 若零点处于预约状态，先以本样本捕获零点并清除预约。
    /// 检查与捕获在同一次加锁中完成，并发样本只会有一个捕获成功。
    ///
    /// 调用方负责过滤未被跟踪的样本。
    pub fn transform(&self, sample: &TrackedSample, robot_base: [i32; 3]) -> [i32; 3] {
        let current = sample.to_millimeters();

        let offset = {
            let mut offset = self.inner.lock();
            if offset.pending {
                offset.x0 = current[0];
                offset.y0 = current[1];
                offset.z0 = current[2];
                offset.pending = false;
                info!(
                    "Zero point captured from body {}: ({}, {}, {})",
                    sample.id, offset.x0, offset.y0, offset.z0
                );
            }
            offset.as_array()
        };

        let robot: [i32; 3] = std::array::from_fn(|axis| {
            robot_base[axis].saturating_add(current[axis].saturating_sub(offset[axis]))
        });
        debug!(
            "Body {} -> robot coordinate ({}, {}, {})",
            sample.id, robot[0], robot[1], robot[2]
        );
        robot
    }
}

/// 机器人坐标 → 坐标指令
///
/// 幅值超出 4 位十六进制的坐标不做修正，指令照常发出（通常退化为哨兵字节），
/// 只记录警告。
pub fn coord_command(robot: [i32; 3]) -> CoordCommand {
    for (axis, value) in ["X", "Y", "Z"].iter().zip(robot) {
        if !coord_fits_field(value) {
            warn!(
                "Robot coordinate {}={} exceeds 4 hex digits, command will not be accepted",
                axis, value
            );
        }
    }
    CoordCommand::new(robot[0], robot[1], robot[2])
}
