//! # Glove Protocol
//!
//! 数据手套传感器帧与机器人控制指令的编解码（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `constants`: 帧头帧尾、帧长、字段偏移等协议常量
//! - `sensor`: 68 字节传感器帧解析
//! - `command`: 机器人控制指令构建（十六进制 ASCII 帧）
//! - `hex_text`: 十六进制文本与字节之间的转换
//!
//! ## 字节序
//!
//! 传感器帧使用小端字节序（Intel / LSB 在前）。
//! 机器人指令中的坐标幅值以大端十六进制文本给出（高位在前）。

pub mod command;
pub mod constants;
pub mod hex_text;
pub mod sensor;

// 重新导出常用类型
pub use command::{
    CoordCommand, CoordSign, HexFrame, Opcode, RobotCommand, coord_field, coord_fits_field,
    encode_command,
};
pub use constants::*;
pub use hex_text::{bytes_to_hex, hex_to_bytes, try_hex_to_bytes};
pub use sensor::{SensorFrame, decoded_log_header, format_aux};

use thiserror::Error;

/// 协议解析错误类型
///
/// `InvalidLength` 与 `InvalidFraming` 合称"畸形帧"，由工作线程就地恢复；
/// `HexFormat` 在指令发送路径上退化为哨兵字节，不会向上传播。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid start or end sequence: header={header:02X?}, footer={footer:02X?}")]
    InvalidFraming { header: [u8; 2], footer: [u8; 2] },

    #[error("Hex format error: {0}")]
    HexFormat(String),

    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),
}

impl ProtocolError {
    /// 是否为畸形帧（长度或帧头帧尾错误）
    pub fn is_malformed_frame(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidLength { .. } | ProtocolError::InvalidFraming { .. }
        )
    }
}

/// 字节序转换工具函数
///
/// 传感器帧为小端字节序，调用方需保证切片长度足够
/// （`SensorFrame::decode` 已先校验整帧长度）。
///
/// 小端字节序转 i32
pub fn bytes_to_i32_le(bytes: [u8; 4]) -> i32 {
    i32::from_le_bytes(bytes)
}

/// 小端字节序转 i16
pub fn bytes_to_i16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// 小端字节序转 f32
pub fn bytes_to_f32_le(bytes: [u8; 4]) -> f32 {
    f32::from_le_bytes(bytes)
}
