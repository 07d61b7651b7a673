//! # 桥接配置
//!
//! 网络端点、日志位置与机器人基准坐标。控制律阈值（900 / 1000）属于协议常量，不在此配置。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 桥接配置
///
/// 从 TOML 文件加载，缺失的字段使用默认值（现场部署时的端点）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// 手套本地端点（机器人指令也从此 socket 发出）
    pub glove_bind: SocketAddr,

    /// 伴随进程中继 socket 的本地端点
    pub companion_bind: SocketAddr,

    /// 原始数据报的中继目标
    pub companion_target: SocketAddr,

    /// 机器人控制器端点
    ///
    /// 来源 IP 与此相同的数据报只中继、不入队。
    pub robot_addr: SocketAddr,

    /// 跟踪样本输入端点（JSON 数据报）
    pub tracking_bind: SocketAddr,

    /// 日志目录
    pub log_dir: PathBuf,

    /// 日志文件基础名
    pub log_base_name: String,

    /// 接收超时（毫秒），即取消标志的检查粒度
    pub recv_timeout_ms: u64,

    /// 启动时发送 Init 指令
    pub send_init_on_start: bool,

    /// 退出时发送 Shutdown 指令
    pub send_shutdown_on_exit: bool,

    /// 机器人坐标系基准点（mm）
    ///
    /// 放在最后：TOML 中表必须位于普通键值之后。
    pub robot_base: RobotBase,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            glove_bind: SocketAddr::from(([192, 168, 1, 102], 1337)),
            companion_bind: SocketAddr::from(([127, 0, 0, 1], 1337)),
            companion_target: SocketAddr::from(([127, 0, 0, 1], 1338)),
            robot_addr: SocketAddr::from(([192, 168, 1, 150], 1337)),
            tracking_bind: SocketAddr::from(([127, 0, 0, 1], 1510)),
            log_dir: PathBuf::from("."),
            log_base_name: "received_data".to_string(),
            recv_timeout_ms: 100,
            send_init_on_start: true,
            send_shutdown_on_exit: true,
            robot_base: RobotBase::default(),
        }
    }
}

impl BridgeConfig {
    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("解析配置文件失败")?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        fs::write(path.as_ref(), content).context("写入配置文件失败")?;
        Ok(())
    }

    /// 序列化为 TOML 文本
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置失败")
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.recv_timeout_ms == 0 {
            anyhow::bail!("recv_timeout_ms 必须大于 0（0 表示永久阻塞，无法响应退出）");
        }
        if self.log_base_name.trim().is_empty() {
            anyhow::bail!("log_base_name 不能为空");
        }
        Ok(())
    }

    /// 接收超时
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

/// 机器人坐标系基准点（mm）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotBase {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Default for RobotBase {
    fn default() -> Self {
        Self { x: 200, y: 0, z: 380 }
    }
}

impl RobotBase {
    pub fn as_array(&self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}
