//! 夹爪控制状态机
//!
//! 输入为单帧 10 个传感器通道的平均值：
//!
//! - `Disengaged → Engaged`：平均值 < 900，发送 `GripperSet(0x01)` 并预约零点捕获
//! - `Engaged → Disengaged`：平均值 > 1000，发送 `GripperSet(0x00)`
//! - `[900, 1000]`（两端包含）为死区，不转换也不发送
//!
//! 阈值是控制律的固定常量，不可配置。

use crate::calibration::Calibration;
use glove_protocol::RobotCommand;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::info;

/// 闭合阈值（严格小于）
pub const ENGAGE_BELOW: f64 = 900.0;

/// 张开阈值（严格大于）
pub const RELEASE_ABOVE: f64 = 1000.0;

/// 夹爪状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum GripState {
    /// 张开（初始状态）
    #[default]
    Disengaged = 0,
    /// 闭合
    Engaged = 1,
}

impl GripState {
    /// 从 u8 转换，无效值视为张开
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Engaged,
            _ => Self::Disengaged,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_engaged(self) -> bool {
        self == Self::Engaged
    }
}

/// 夹爪状态（原子版本）
///
/// 只有 worker 线程写入，其它线程只读（例如退出时打印状态）。
#[derive(Debug, Default)]
pub struct AtomicGripState {
    inner: AtomicU8,
}

impl AtomicGripState {
    pub fn new(state: GripState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> GripState {
        GripState::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, state: GripState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }
}

/// 滞回控制器
#[derive(Debug, Default)]
pub struct GripController {
    state: AtomicGripState,
}

impl GripController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态
    pub fn state(&self) -> GripState {
        self.state.get(Ordering::Acquire)
    }

    /// 输入一帧的通道平均值
    ///
    /// 发生状态转换时返回需要发送的夹爪指令；闭合时同时预约一次零点捕获。
    pub fn update(&self, mean: f64, calibration: &Calibration) -> Option<RobotCommand> {
        match self.state() {
            GripState::Disengaged if mean < ENGAGE_BELOW => {
                let armed = calibration.arm();
                self.state.set(GripState::Engaged, Ordering::Release);
                info!("Gripper engaged (mean={:.1}, zero point armed: {})", mean, armed);
                Some(RobotCommand::gripper_set(true))
            },
            GripState::Engaged if mean > RELEASE_ABOVE => {
                self.state.set(GripState::Disengaged, Ordering::Release);
                info!("Gripper released (mean={:.1})", mean);
                Some(RobotCommand::gripper_set(false))
            },
            _ => None,
        }
    }
}
