//! # Glove Tools - 持久化与配置
//!
//! **依赖原则**: 只依赖 `glove-protocol`，不依赖驱动层线程
//!
//! ## 包含模块
//!
//! - `config` - 桥接配置（TOML 文件）
//! - `frame_log` - 原始 / 解码双日志写入

pub mod config;
pub mod frame_log;

// 重新导出常用类型
pub use config::{BridgeConfig, RobotBase};
pub use frame_log::{DECODED_LOG_KIND, FrameLogWriter, RAW_LOG_KIND, unique_log_path};
