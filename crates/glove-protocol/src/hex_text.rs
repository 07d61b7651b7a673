//! 十六进制文本编解码
//!
//! 文本格式与手套/机器人两侧约定一致：每字节两位大写十六进制，字节之间用单个空格分隔，
//! 例如 `5A 5A 41 01 A5 A5`。

use crate::ProtocolError;
use crate::constants::HEX_SENTINEL;

/// 字节序列转为空格分隔的大写十六进制文本
///
/// ```
/// use glove_protocol::bytes_to_hex;
///
/// assert_eq!(bytes_to_hex(&[0x5A, 0x0F, 0xA5]), "5A 0F A5");
/// assert_eq!(bytes_to_hex(&[]), "");
/// ```
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&::hex::encode_upper([*byte]));
    }
    out
}

/// 十六进制文本转字节（严格版本）
///
/// 先去掉所有空格，再按两位一组解析；长度为奇数或包含非十六进制字符时返回
/// [`ProtocolError::HexFormat`]。大小写均可。
pub fn try_hex_to_bytes(s: &str) -> Result<Vec<u8>, ProtocolError> {
    let stripped: String = s.chars().filter(|c| *c != ' ').collect();
    ::hex::decode(&stripped).map_err(|e| ProtocolError::HexFormat(e.to_string()))
}

/// 十六进制文本转字节（容错版本）
///
/// 转换失败时不向上传播错误，而是返回固定的哨兵字节 [`HEX_SENTINEL`]（`FF EE`），
/// 使格式错误的指令仍然会被发出。
///
/// ```
/// use glove_protocol::hex_to_bytes;
///
/// assert_eq!(hex_to_bytes("5A 5A 08 A5 A5"), vec![0x5A, 0x5A, 0x08, 0xA5, 0xA5]);
/// assert_eq!(hex_to_bytes("ZZ"), vec![0xFF, 0xEE]);
/// assert_eq!(hex_to_bytes("5A5"), vec![0xFF, 0xEE]);
/// ```
pub fn hex_to_bytes(s: &str) -> Vec<u8> {
    try_hex_to_bytes(s).unwrap_or_else(|_| HEX_SENTINEL.to_vec())
}
