//! 传感器帧解析
//!
//! 手套每个 UDP 数据报承载一帧 68 字节的遥测数据（小端字节序）：
//!
//! ```text
//! [0..2]   = 5A 5A          帧头
//! [2]      = DN
//! [3]      = SN
//! [4..8]   = 秒级时间戳     i32
//! [8..10]  = 毫秒级时间戳   i16
//! [10..30] = 10 × i16       弯曲传感器通道
//! [30..66] = 9 × f32        磁力计 / 陀螺仪 / 加速度计
//! [66..68] = A5 A5          帧尾
//! ```

use crate::ProtocolError;
use crate::constants::*;
use crate::{bytes_to_f32_le, bytes_to_i16_le, bytes_to_i32_le};

/// 解码后的传感器帧
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorFrame {
    /// 设备号
    pub dn: u8,
    /// 序列号
    pub sn: u8,
    /// 秒级时间戳
    pub timestamp_secs: i32,
    /// 毫秒级时间戳
    pub timestamp_millis: i16,
    /// 整型传感器通道
    pub channels: [i16; SENSOR_CHANNEL_COUNT],
    /// 浮点辅助通道
    pub aux_channels: [f32; AUX_CHANNEL_COUNT],
}

impl SensorFrame {
    /// 解析一帧原始数据
    ///
    /// 长度必须恰好为 68 字节，且帧头为 `5A 5A`、帧尾为 `A5 A5`，否则返回错误。
    /// 解析是全有或全无的：失败时不会产生任何部分结果。
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != SENSOR_FRAME_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: SENSOR_FRAME_LEN,
                actual: bytes.len(),
            });
        }

        let header = [bytes[0], bytes[1]];
        let footer = [bytes[SENSOR_FRAME_LEN - 2], bytes[SENSOR_FRAME_LEN - 1]];
        if header != FRAME_HEAD || footer != FRAME_TAIL {
            return Err(ProtocolError::InvalidFraming { header, footer });
        }

        let mut channels = [0i16; SENSOR_CHANNEL_COUNT];
        for (i, channel) in channels.iter_mut().enumerate() {
            let at = OFFSET_CHANNELS + i * 2;
            *channel = bytes_to_i16_le([bytes[at], bytes[at + 1]]);
        }

        let mut aux_channels = [0f32; AUX_CHANNEL_COUNT];
        for (i, aux) in aux_channels.iter_mut().enumerate() {
            let at = OFFSET_AUX_CHANNELS + i * 4;
            *aux = bytes_to_f32_le([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        }

        let ts = OFFSET_TIMESTAMP_SECS;
        let ms = OFFSET_TIMESTAMP_MILLIS;
        Ok(Self {
            dn: bytes[OFFSET_DN],
            sn: bytes[OFFSET_SN],
            timestamp_secs: bytes_to_i32_le([bytes[ts], bytes[ts + 1], bytes[ts + 2], bytes[ts + 3]]),
            timestamp_millis: bytes_to_i16_le([bytes[ms], bytes[ms + 1]]),
            channels,
            aux_channels,
        })
    }

    /// 按线格式编码为 68 字节（手套侧的帧格式，用于模拟与回放）
    pub fn to_bytes(&self) -> [u8; SENSOR_FRAME_LEN] {
        let mut buf = [0u8; SENSOR_FRAME_LEN];
        buf[..2].copy_from_slice(&FRAME_HEAD);
        buf[OFFSET_DN] = self.dn;
        buf[OFFSET_SN] = self.sn;
        buf[OFFSET_TIMESTAMP_SECS..OFFSET_TIMESTAMP_SECS + 4]
            .copy_from_slice(&self.timestamp_secs.to_le_bytes());
        buf[OFFSET_TIMESTAMP_MILLIS..OFFSET_TIMESTAMP_MILLIS + 2]
            .copy_from_slice(&self.timestamp_millis.to_le_bytes());
        for (i, channel) in self.channels.iter().enumerate() {
            let at = OFFSET_CHANNELS + i * 2;
            buf[at..at + 2].copy_from_slice(&channel.to_le_bytes());
        }
        for (i, aux) in self.aux_channels.iter().enumerate() {
            let at = OFFSET_AUX_CHANNELS + i * 4;
            buf[at..at + 4].copy_from_slice(&aux.to_le_bytes());
        }
        buf[SENSOR_FRAME_LEN - 2..].copy_from_slice(&FRAME_TAIL);
        buf
    }

    /// 10 个整型通道的算术平均值（单帧，非滑动窗口）
    pub fn channel_mean(&self) -> f64 {
        let sum: i32 = self.channels.iter().map(|&v| v as i32).sum();
        sum as f64 / SENSOR_CHANNEL_COUNT as f64
    }

    /// 渲染为解码日志中的一行
    ///
    /// 格式：`dn, sn, sec.mmm, s1, …, s10, f1, …, f9`，毫秒补零到 3 位，
    /// 浮点通道见 [`format_aux`]。
    pub fn to_log_row(&self) -> String {
        let mut fields = Vec::with_capacity(3 + SENSOR_CHANNEL_COUNT + AUX_CHANNEL_COUNT);
        fields.push(self.dn.to_string());
        fields.push(self.sn.to_string());
        fields.push(self.timestamp_text());
        fields.extend(self.channels.iter().map(|v| v.to_string()));
        fields.extend(self.aux_channels.iter().map(|&v| format_aux(v)));
        fields.join(", ")
    }

    /// `sec.mmm`；负毫秒保留符号，补零只作用于数字部分（`-5 → "-005"`）
    fn timestamp_text(&self) -> String {
        let millis = self.timestamp_millis;
        if millis < 0 {
            format!("{}.-{:03}", self.timestamp_secs, millis.unsigned_abs())
        } else {
            format!("{}.{:03}", self.timestamp_secs, millis)
        }
    }
}

/// 浮点通道的日志文本
///
/// 7 位有效数字，去掉末尾的 0。十进制指数落在 `[-4, 7)` 之外时使用科学计数法，
/// 指数至少两位（`1.234568E+08`、`1E-05`）。非有限值写作 `NaN`、`Infinity`、`-Infinity`。
///
/// ```
/// use glove_protocol::format_aux;
///
/// assert_eq!(format_aux(1.0 / 3.0), "0.3333333");
/// assert_eq!(format_aux(f32::INFINITY), "Infinity");
/// ```
pub fn format_aux(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // 先按 7 位有效数字取整，再由取整后的指数决定记法
    let scientific = format!("{:.*e}", AUX_SIGNIFICANT_DIGITS - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if (-4..AUX_SIGNIFICANT_DIGITS as i32).contains(&exponent) {
        let decimals = (AUX_SIGNIFICANT_DIGITS as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}E{}{:02}", trim_fraction(mantissa), sign, exponent.unsigned_abs())
    }
}

const AUX_SIGNIFICANT_DIGITS: usize = 7;

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// 解码日志的表头行
///
/// `DN, SN, Timestamp, SensorData1..10, FloatSensorData1..9`
pub fn decoded_log_header() -> String {
    let mut fields = vec!["DN".to_string(), "SN".to_string(), "Timestamp".to_string()];
    fields.extend((1..=SENSOR_CHANNEL_COUNT).map(|i| format!("SensorData{i}")));
    fields.extend((1..=AUX_CHANNEL_COUNT).map(|i| format!("FloatSensorData{i}")));
    fields.join(", ")
}
