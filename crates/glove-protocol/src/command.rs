//! 机器人控制指令构建
//!
//! 控制器接收的是"十六进制 ASCII 帧"转换后的原始字节：
//!
//! ```text
//! 5A 5A <opcode> [payload...] A5 A5
//! ```
//!
//! 构建过程先生成空格分隔的大写十六进制文本，再经 [`hex_to_bytes`] 转为字节发送。

use crate::constants::*;
use crate::hex_text::{bytes_to_hex, hex_to_bytes};
use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 指令码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    /// 控制器初始化（无载荷）
    Init = 0x08,
    /// 控制器关闭（无载荷）
    Shutdown = 0x09,
    /// 末端坐标（12 字节载荷）
    Coord = 0x10,
    /// 电动夹爪初始化（1 字节载荷）
    GripperInit = 0x40,
    /// 电动夹爪开合（1 字节载荷：0x00 张开 / 0x01 闭合）
    GripperSet = 0x41,
}

impl Opcode {
    /// 该指令码要求的载荷长度
    pub fn payload_len(self) -> usize {
        match self {
            Opcode::Init | Opcode::Shutdown => 0,
            Opcode::Coord => COORD_PAYLOAD_LEN,
            Opcode::GripperInit | Opcode::GripperSet => 1,
        }
    }
}

/// 坐标符号位掩码
///
/// Bit 0 = X 为负，Bit 1 = Y 为负，Bit 2 = Z 为负，其余位为 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordSign(u8);

impl CoordSign {
    pub const X_NEGATIVE: u8 = 1 << 0;
    pub const Y_NEGATIVE: u8 = 1 << 1;
    pub const Z_NEGATIVE: u8 = 1 << 2;

    /// 根据三轴坐标计算符号掩码
    pub fn from_axes(x: i32, y: i32, z: i32) -> Self {
        let mut mask = 0u8;
        if x < 0 {
            mask |= Self::X_NEGATIVE;
        }
        if y < 0 {
            mask |= Self::Y_NEGATIVE;
        }
        if z < 0 {
            mask |= Self::Z_NEGATIVE;
        }
        Self(mask)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// 单轴坐标的十六进制文本字段
///
/// 取绝对值渲染为至少 4 位的大写十六进制，在前两位之后插入一个空格，
/// 例如 `200 → "00 C8"`。幅值超过 `0xFFFF` 时位数不再是 4，整帧文本随之失去
/// 两位一组的结构（例如 `70000 → "11 170"`），由 [`hex_to_bytes`] 决定最终发送的字节。
///
/// ```
/// use glove_protocol::coord_field;
///
/// assert_eq!(coord_field(-300), "01 2C");
/// assert_eq!(coord_field(70000), "11 170");
/// ```
pub fn coord_field(value: i32) -> String {
    let mut digits = format!("{:04X}", value.unsigned_abs());
    digits.insert(2, ' ');
    digits
}

/// 坐标幅值能否放进 2 字节字段
pub fn coord_fits_field(value: i32) -> bool {
    value.unsigned_abs() <= u32::from(u16::MAX)
}

/// 可以渲染为十六进制 ASCII 帧的指令
///
/// 线上字节总是由文本经 [`hex_to_bytes`] 转换得到，文本非法时发送哨兵字节。
pub trait HexFrame {
    /// 指令码
    fn opcode(&self) -> Opcode;

    /// 十六进制 ASCII 帧，例如 `5A 5A 41 01 A5 A5`
    fn to_hex_string(&self) -> String;

    /// 发送用字节（十六进制文本转换后的结果）
    fn encode(&self) -> Vec<u8> {
        hex_to_bytes(&self.to_hex_string())
    }
}

/// 机器人控制指令
///
/// 每次触发事件时构建，序列化发送后即丢弃。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotCommand {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

impl RobotCommand {
    /// 通用构造器
    pub fn new(opcode: Opcode, payload: Vec<u8>) -> Self {
        Self { opcode, payload }
    }

    /// 控制器初始化
    pub fn init() -> Self {
        Self::new(Opcode::Init, Vec::new())
    }

    /// 控制器关闭
    pub fn shutdown() -> Self {
        Self::new(Opcode::Shutdown, Vec::new())
    }

    /// 电动夹爪初始化
    pub fn gripper_init(mode: u8) -> Self {
        Self::new(Opcode::GripperInit, vec![mode])
    }

    /// 电动夹爪开合（`true` = 闭合 0x01，`false` = 张开 0x00）
    pub fn gripper_set(closed: bool) -> Self {
        Self::new(Opcode::GripperSet, vec![u8::from(closed)])
    }

    /// 从线上字节解析指令（控制器侧的校验规则）
    ///
    /// 校验帧头帧尾、指令码以及载荷长度。
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < 5 {
            return Err(ProtocolError::InvalidLength {
                expected: 5,
                actual: bytes.len(),
            });
        }
        let header = [bytes[0], bytes[1]];
        let footer = [bytes[bytes.len() - 2], bytes[bytes.len() - 1]];
        if header != FRAME_HEAD || footer != FRAME_TAIL {
            return Err(ProtocolError::InvalidFraming { header, footer });
        }

        let opcode = Opcode::try_from(bytes[2]).map_err(|e| ProtocolError::UnknownOpcode(e.number))?;
        let payload = &bytes[3..bytes.len() - 2];
        if payload.len() != opcode.payload_len() {
            return Err(ProtocolError::InvalidLength {
                expected: opcode.payload_len() + 5,
                actual: bytes.len(),
            });
        }
        Ok(Self::new(opcode, payload.to_vec()))
    }
}

impl HexFrame for RobotCommand {
    fn opcode(&self) -> Opcode {
        self.opcode
    }

    fn to_hex_string(&self) -> String {
        let mut bytes = Vec::with_capacity(self.payload.len() + 5);
        bytes.extend_from_slice(&FRAME_HEAD);
        bytes.push(self.opcode.into());
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&FRAME_TAIL);
        bytes_to_hex(&bytes)
    }
}

/// 末端坐标指令（机器人坐标系，单位 mm）
///
/// 载荷：`X(2) Y(2) Z(2) 00 00 00 20 00 sign`，幅值为大端，
/// 符号单独放在最后一个字节的掩码中。
///
/// 幅值超出 `0xFFFF` 时不做截断：文本按 [`coord_field`] 原样拼接，
/// 位数为奇数时整帧转换失败，发出的是哨兵字节 `FF EE`，控制器会将其丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordCommand {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CoordCommand {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn sign(&self) -> CoordSign {
        CoordSign::from_axes(self.x, self.y, self.z)
    }

    /// 三轴幅值是否都能放进 2 字节字段
    pub fn fits_fields(&self) -> bool {
        [self.x, self.y, self.z].into_iter().all(coord_fits_field)
    }
}

impl HexFrame for CoordCommand {
    fn opcode(&self) -> Opcode {
        Opcode::Coord
    }

    fn to_hex_string(&self) -> String {
        let mut tokens = vec![
            bytes_to_hex(&FRAME_HEAD),
            bytes_to_hex(&[u8::from(Opcode::Coord)]),
        ];
        tokens.extend([self.x, self.y, self.z].map(coord_field));
        tokens.push(bytes_to_hex(&[0u8; COORD_RESERVED_LEN]));
        tokens.push(bytes_to_hex(&COORD_FIXED_FIELD));
        tokens.push(bytes_to_hex(&[self.sign().bits()]));
        tokens.push(bytes_to_hex(&FRAME_TAIL));
        tokens.join(" ")
    }
}

/// 按指令码与载荷直接编码（`5A 5A` + opcode + payload + `A5 A5`）
///
/// 与 [`HexFrame::encode`] 不同，此函数不校验指令码是否已定义。
pub fn encode_command(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut tokens = vec![bytes_to_hex(&FRAME_HEAD), bytes_to_hex(&[opcode])];
    if !payload.is_empty() {
        tokens.push(bytes_to_hex(payload));
    }
    tokens.push(bytes_to_hex(&FRAME_TAIL));
    hex_to_bytes(&tokens.join(" "))
}
