//! 协议常量定义
//!
//! 集中定义帧格式相关的常量，避免在代码中散落"魔法数"。

/// 传感器帧总长度（字节）
pub const SENSOR_FRAME_LEN: usize = 68;

/// 帧头（传感器帧与机器人指令共用）
pub const FRAME_HEAD: [u8; 2] = [0x5A, 0x5A];

/// 帧尾（传感器帧与机器人指令共用）
pub const FRAME_TAIL: [u8; 2] = [0xA5, 0xA5];

/// 整型传感器通道数量
pub const SENSOR_CHANNEL_COUNT: usize = 10;

/// 浮点辅助通道数量（磁力计 / 陀螺仪 / 加速度计各 3 轴）
pub const AUX_CHANNEL_COUNT: usize = 9;

// === 传感器帧字段偏移 ===

/// DN 号偏移
pub const OFFSET_DN: usize = 2;
/// SN 号偏移
pub const OFFSET_SN: usize = 3;
/// 秒级时间戳偏移（i32 LE）
pub const OFFSET_TIMESTAMP_SECS: usize = 4;
/// 毫秒级时间戳偏移（i16 LE）
pub const OFFSET_TIMESTAMP_MILLIS: usize = 8;
/// 整型传感器通道起始偏移（10 × i16 LE）
pub const OFFSET_CHANNELS: usize = 10;
/// 浮点辅助通道起始偏移（9 × f32 LE）
pub const OFFSET_AUX_CHANNELS: usize = 30;

/// 指令转换失败时发送的哨兵字节
///
/// 十六进制文本非法时仍然发送这两个字节，而不是让调用方崩溃。
pub const HEX_SENTINEL: [u8; 2] = [0xFF, 0xEE];

/// 坐标指令中紧随 3 个保留字节之后的固定字段
pub const COORD_FIXED_FIELD: [u8; 2] = [0x20, 0x00];

/// 坐标指令中保留字节数量
pub const COORD_RESERVED_LEN: usize = 3;

/// 坐标指令载荷长度（X/Y/Z 各 2 字节 + 保留 3 字节 + 固定 2 字节 + 符号 1 字节）
pub const COORD_PAYLOAD_LEN: usize = 3 * 2 + COORD_RESERVED_LEN + COORD_FIXED_FIELD.len() + 1;

/// 解码日志中解析失败的占位行
pub const PARSE_FAILED_ROW: &str = "Parse failed";
