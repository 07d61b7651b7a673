//! # 帧日志
//!
//! 每个运行周期两份只追加的文本日志：
//!
//! - `<base>_hex.csv`：每个数据报一行空格分隔的十六进制
//! - `<base>_packet.csv`：解码后的行（首行写一次表头），解析失败时写 `Parse failed`
//!
//! 两个文件的写入在同一把锁内完成，观察者不会看到原始行与解码行之间的错序。
//! 写入失败只记录日志并计数，不向流水线传播。

use anyhow::{Context, Result};
use glove_protocol::decoded_log_header;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// 原始日志类型后缀
pub const RAW_LOG_KIND: &str = "hex";

/// 解码日志类型后缀
pub const DECODED_LOG_KIND: &str = "packet";

/// 生成本次运行唯一的日志路径
///
/// 优先 `<dir>/<base>_<kind>.csv`，若已存在则依次尝试 `<base>_<kind>(1).csv`、`(2)` …
pub fn unique_log_path(dir: &Path, base: &str, kind: &str) -> PathBuf {
    let mut index = 0u32;
    loop {
        let name = if index == 0 {
            format!("{base}_{kind}.csv")
        } else {
            format!("{base}_{kind}({index}).csv")
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

struct LogSinks {
    raw: Box<dyn Write + Send>,
    decoded: Box<dyn Write + Send>,
    /// 表头是否已经写出（只消费一次）
    header_written: bool,
}

/// 双日志写入器
///
/// 线程安全：内部使用一把互斥锁同时保护两个文件句柄。
pub struct FrameLogWriter {
    sinks: Mutex<LogSinks>,
    raw_path: Option<PathBuf>,
    decoded_path: Option<PathBuf>,
    rows_written: AtomicU64,
    rows_dropped: AtomicU64,
}

impl FrameLogWriter {
    /// 在目录中创建本次运行的两个日志文件
    pub fn create(dir: &Path, base_name: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("创建日志目录失败: {}", dir.display()))?;

        let raw_path = unique_log_path(dir, base_name, RAW_LOG_KIND);
        let decoded_path = unique_log_path(dir, base_name, DECODED_LOG_KIND);

        let raw = open_append(&raw_path)?;
        let decoded = open_append(&decoded_path)?;

        debug!(
            "Frame logs opened: raw={}, decoded={}",
            raw_path.display(),
            decoded_path.display()
        );

        let mut writer = Self::from_writers(Box::new(raw), Box::new(decoded));
        writer.raw_path = Some(raw_path);
        writer.decoded_path = Some(decoded_path);
        Ok(writer)
    }

    /// 使用任意写入端构建（测试与自定义落盘）
    pub fn from_writers(raw: Box<dyn Write + Send>, decoded: Box<dyn Write + Send>) -> Self {
        Self {
            sinks: Mutex::new(LogSinks {
                raw,
                decoded,
                header_written: false,
            }),
            raw_path: None,
            decoded_path: None,
            rows_written: AtomicU64::new(0),
            rows_dropped: AtomicU64::new(0),
        }
    }

    /// 追加一对日志行
    ///
    /// `raw_hex` 写入原始日志，`decoded_row` 写入解码日志。
    /// 返回是否写入成功；失败时该行被丢弃并计数。
    pub fn append(&self, raw_hex: &str, decoded_row: &str) -> bool {
        let mut sinks = self.sinks.lock();

        let mut decoded = String::with_capacity(decoded_row.len() + 256);
        if !sinks.header_written {
            decoded.push_str(&decoded_log_header());
            decoded.push('\n');
            sinks.header_written = true;
        }
        decoded.push_str(decoded_row);
        decoded.push('\n');

        match write_pair(&mut sinks, raw_hex, &decoded) {
            Ok(()) => {
                self.rows_written.fetch_add(1, Ordering::Relaxed);
                true
            },
            Err(e) => {
                self.rows_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Unable to write frame log row: {}", e);
                false
            },
        }
    }

    /// 原始日志路径（通过 `create` 构建时可用）
    pub fn raw_path(&self) -> Option<&Path> {
        self.raw_path.as_deref()
    }

    /// 解码日志路径（通过 `create` 构建时可用）
    pub fn decoded_path(&self) -> Option<&Path> {
        self.decoded_path.as_deref()
    }

    /// 成功写入的行数
    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    /// 因写入失败而丢弃的行数
    pub fn rows_dropped(&self) -> u64 {
        self.rows_dropped.load(Ordering::Relaxed)
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("打开日志文件失败: {}", path.display()))
}

fn write_pair(sinks: &mut LogSinks, raw_hex: &str, decoded: &str) -> io::Result<()> {
    sinks.raw.write_all(raw_hex.as_bytes())?;
    sinks.raw.write_all(b"\n")?;
    sinks.raw.flush()?;
    sinks.decoded.write_all(decoded.as_bytes())?;
    sinks.decoded.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// 共享内存写入端，便于断言内容
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// 总是失败的写入端
    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unique_log_path() {
        let dir = tempfile::tempdir().unwrap();

        let first = unique_log_path(dir.path(), "received_data", "hex");
        assert_eq!(first, dir.path().join("received_data_hex.csv"));

        File::create(&first).unwrap();
        let second = unique_log_path(dir.path(), "received_data", "hex");
        assert_eq!(second, dir.path().join("received_data_hex(1).csv"));

        File::create(&second).unwrap();
        let third = unique_log_path(dir.path(), "received_data", "hex");
        assert_eq!(third, dir.path().join("received_data_hex(2).csv"));
    }

    #[test]
    fn test_header_written_once() {
        let raw = SharedBuf::default();
        let decoded = SharedBuf::default();
        let writer = FrameLogWriter::from_writers(Box::new(raw.clone()), Box::new(decoded.clone()));

        assert!(writer.append("5A 5A", "Parse failed"));
        assert!(writer.append("5A 5A A5 A5", "1, 2, 3.004"));

        assert_eq!(raw.text(), "5A 5A\n5A 5A A5 A5\n");
        let lines: Vec<_> = decoded.text().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], decoded_log_header());
        assert_eq!(lines[1], "Parse failed");
        assert_eq!(lines[2], "1, 2, 3.004");
        assert_eq!(writer.rows_written(), 2);
        assert_eq!(writer.rows_dropped(), 0);
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let decoded = SharedBuf::default();
        let writer = FrameLogWriter::from_writers(Box::new(BrokenSink), Box::new(decoded.clone()));

        assert!(!writer.append("AA", "row"));
        assert!(!writer.append("BB", "row"));
        assert_eq!(writer.rows_written(), 0);
        assert_eq!(writer.rows_dropped(), 2);
        // 原始日志先写，失败后解码日志不会出现孤立行
        assert_eq!(decoded.text(), "");
    }

    #[test]
    fn test_create_writes_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameLogWriter::create(dir.path(), "received_data").unwrap();

        writer.append("01 02", "Parse failed");
        writer.append("03 04", "Parse failed");

        let raw = fs::read_to_string(writer.raw_path().unwrap()).unwrap();
        let decoded = fs::read_to_string(writer.decoded_path().unwrap()).unwrap();
        assert_eq!(raw, "01 02\n03 04\n");
        assert!(decoded.starts_with("DN, SN, Timestamp"));
        assert_eq!(decoded.lines().count(), 3);

        // 第二次运行使用新文件名
        let second = FrameLogWriter::create(dir.path(), "received_data").unwrap();
        assert_eq!(
            second.raw_path().unwrap(),
            dir.path().join("received_data_hex(1).csv")
        );
        assert_eq!(
            second.decoded_path().unwrap(),
            dir.path().join("received_data_packet(1).csv")
        );
    }

    #[test]
    fn test_concurrent_appends_keep_pairs_aligned() {
        let raw = SharedBuf::default();
        let decoded = SharedBuf::default();
        let writer = Arc::new(FrameLogWriter::from_writers(
            Box::new(raw.clone()),
            Box::new(decoded.clone()),
        ));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let tag = format!("{t}-{i}");
                        writer.append(&tag, &tag);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let raw_lines: Vec<_> = raw.text().lines().map(str::to_string).collect();
        let decoded_lines: Vec<_> = decoded.text().lines().skip(1).map(str::to_string).collect();
        assert_eq!(raw_lines.len(), 200);
        assert_eq!(raw_lines, decoded_lines);
    }
}
