//! Bridge 集成测试
//!
//! 使用内存 socket 验证完整链路：
//! 1. 手套帧 → 解码行 + 夹爪指令
//! 2. 机器人来源的数据报只中继
//! 3. 闭合事件后的一次性零点捕获
//! 4. 生命周期（Init / Shutdown、重复启动、socket 关闭）

use glove_driver::{
    BridgeBuilder, DatagramSocket, DriverError, GripState, TrackedSample, TransportError,
};
use glove_protocol::{SensorFrame, bytes_to_hex, decoded_log_header};
use glove_tools::{BridgeConfig, FrameLogWriter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Mock socket：预置接收队列，记录所有发送
#[derive(Default)]
struct MockSocket {
    inbox: Mutex<VecDeque<(Vec<u8>, SocketAddr)>>,
    sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    closed: AtomicBool,
}

impl MockSocket {
    fn push(&self, data: &[u8], from: SocketAddr) {
        self.inbox.lock().push_back((data.to_vec(), from));
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.sent.lock().clone()
    }

    fn sent_to(&self, target: SocketAddr) -> Vec<Vec<u8>> {
        self.sent()
            .into_iter()
            .filter(|(_, to)| *to == target)
            .map(|(data, _)| data)
            .collect()
    }
}

impl DatagramSocket for MockSocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, TransportError> {
        self.sent.lock().push((buf.to_vec(), target));
        Ok(buf.len())
    }

    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        if let Some((data, from)) = self.inbox.lock().pop_front() {
            buf[..data.len()].copy_from_slice(&data);
            return Ok((data.len(), from));
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        thread::sleep(Duration::from_millis(2));
        Err(TransportError::Timeout)
    }
}

struct Harness {
    glove: Arc<MockSocket>,
    companion: Arc<MockSocket>,
    config: BridgeConfig,
    dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            log_dir: dir.path().to_path_buf(),
            recv_timeout_ms: 10,
            ..Default::default()
        };
        Self {
            glove: Arc::new(MockSocket::default()),
            companion: Arc::new(MockSocket::default()),
            config,
            dir,
        }
    }

    fn builder(&self) -> BridgeBuilder {
        BridgeBuilder::new()
            .config(self.config.clone())
            .glove_socket(self.glove.clone())
            .companion_socket(self.companion.clone())
    }

    fn glove_peer(&self) -> SocketAddr {
        "192.168.1.102:40000".parse().unwrap()
    }

    fn read_log(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).unwrap_or_default()
    }
}

fn sample_frame(channel: i16) -> SensorFrame {
    SensorFrame {
        dn: 1,
        sn: 2,
        timestamp_secs: 100,
        timestamp_millis: 250,
        channels: [channel; 10],
        aux_channels: [1.5; 9],
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        thread::sleep(Duration::from_millis(5));
    }
}

fn tracked(x: f64, y: f64, z: f64) -> TrackedSample {
    TrackedSample {
        id: 7,
        tracked: true,
        x,
        y,
        z,
    }
}

#[test]
fn test_end_to_end_frame_engages_gripper() {
    let harness = Harness::new();
    let robot = harness.config.robot_addr;
    let companion_target = harness.config.companion_target;
    let mut bridge = harness.builder().build().unwrap();
    bridge.start().unwrap();

    let datagram = sample_frame(850).to_bytes();
    harness.glove.push(&datagram, harness.glove_peer());
    wait_until(|| bridge.frame_log().rows_written() == 1);

    assert_eq!(bridge.grip_state(), GripState::Engaged);
    assert!(bridge.calibration_offset().pending);

    // 原样中继
    assert_eq!(harness.companion.sent_to(companion_target), vec![datagram.to_vec()]);

    bridge.shutdown();

    // Init → GripperSet(0x01) → Shutdown
    assert_eq!(
        harness.glove.sent_to(robot),
        vec![
            vec![0x5A, 0x5A, 0x08, 0xA5, 0xA5],
            vec![0x5A, 0x5A, 0x41, 0x01, 0xA5, 0xA5],
            vec![0x5A, 0x5A, 0x09, 0xA5, 0xA5],
        ]
    );

    let decoded = harness.read_log("received_data_packet.csv");
    let lines: Vec<_> = decoded.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], decoded_log_header());
    assert_eq!(
        lines[1],
        "1, 2, 100.250, 850, 850, 850, 850, 850, 850, 850, 850, 850, 850, \
         1.5, 1.5, 1.5, 1.5, 1.5, 1.5, 1.5, 1.5, 1.5"
    );
    assert_eq!(
        harness.read_log("received_data_hex.csv"),
        format!("{}\n", bytes_to_hex(&datagram))
    );
}

#[test]
fn test_robot_datagrams_are_relayed_not_queued() {
    let harness = Harness::new();
    let robot = harness.config.robot_addr;
    let mut bridge = harness.builder().build().unwrap();
    bridge.start().unwrap();

    // 机器人地址发来的帧即使格式合法也不处理
    harness.glove.push(&sample_frame(850).to_bytes(), robot);
    harness.glove.push(&sample_frame(950).to_bytes(), harness.glove_peer());
    wait_until(|| bridge.frame_log().rows_written() == 1);
    bridge.shutdown();

    let metrics = bridge.metrics();
    assert_eq!(metrics.datagrams_received, 2);
    assert_eq!(metrics.datagrams_relayed, 2);
    assert_eq!(metrics.robot_echoes_skipped, 1);
    assert_eq!(metrics.datagrams_queued, 1);
    assert_eq!(bridge.grip_state(), GripState::Disengaged);

    let decoded = harness.read_log("received_data_packet.csv");
    assert_eq!(decoded.lines().count(), 2);
    assert!(decoded.lines().nth(1).unwrap().contains(", 950, "));
}

#[test]
fn test_malformed_frames_do_not_halt_pipeline() {
    let harness = Harness::new();
    let mut bridge = harness.builder().build().unwrap();
    bridge.start().unwrap();

    let mut bad_footer = sample_frame(850).to_bytes();
    bad_footer[67] = 0x00;
    harness.glove.push(&[0x5A, 0x5A, 0x01], harness.glove_peer());
    harness.glove.push(&bad_footer, harness.glove_peer());
    harness.glove.push(&sample_frame(850).to_bytes(), harness.glove_peer());
    wait_until(|| bridge.frame_log().rows_written() == 3);
    bridge.shutdown();

    let decoded = harness.read_log("received_data_packet.csv");
    let lines: Vec<_> = decoded.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], decoded_log_header());
    assert_eq!(lines[1], "Parse failed");
    assert_eq!(lines[2], "Parse failed");
    assert!(lines[3].starts_with("1, 2, 100.250, 850"));
    assert_eq!(harness.read_log("received_data_hex.csv").lines().count(), 3);
    assert_eq!(bridge.metrics().frames_malformed, 2);
    assert_eq!(bridge.grip_state(), GripState::Engaged);
}

#[test]
fn test_engage_then_samples_capture_zero_point_once() {
    let harness = Harness::new();
    let robot = harness.config.robot_addr;
    let mut bridge = harness.builder().build().unwrap();
    bridge.start().unwrap();

    // 未闭合前：偏移为 0，直接加基准点
    bridge.submit_sample(&tracked(0.010, 0.0, 0.0)).unwrap();

    harness.glove.push(&sample_frame(850).to_bytes(), harness.glove_peer());
    wait_until(|| bridge.grip_state() == GripState::Engaged);
    assert!(bridge.calibration_offset().pending);

    bridge.submit_sample(&tracked(0.5, 0.25, 1.0)).unwrap();
    bridge.submit_sample(&tracked(0.6, 0.25, 1.0)).unwrap();
    bridge.submit_sample(&tracked(0.4, 0.25, 1.0)).unwrap();

    let offset = bridge.calibration_offset();
    assert!(!offset.pending);
    assert_eq!([offset.x0, offset.y0, offset.z0], [500, 250, 1000]);

    let coords: Vec<_> = harness
        .glove
        .sent_to(robot)
        .into_iter()
        .filter(|cmd| cmd[2] == 0x10)
        .collect();
    assert_eq!(coords.len(), 4);
    // (210, 0, 380)
    assert_eq!(&coords[0][3..9], &[0x00, 0xD2, 0x00, 0x00, 0x01, 0x7C]);
    // 零点样本正好落在基准点 (200, 0, 380)
    assert_eq!(&coords[1][3..9], &[0x00, 0xC8, 0x00, 0x00, 0x01, 0x7C]);
    // (300, 0, 380)
    assert_eq!(&coords[2][3..5], &[0x01, 0x2C]);
    // (100, 0, 380)
    assert_eq!(&coords[3][3..5], &[0x00, 0x64]);
    assert!(coords.iter().all(|cmd| cmd[14] == 0));
}

#[test]
fn test_untracked_samples_are_dropped() {
    let harness = Harness::new();
    let bridge = harness.builder().build().unwrap();

    let sample = TrackedSample {
        tracked: false,
        ..tracked(1.0, 1.0, 1.0)
    };
    bridge.submit_sample(&sample).unwrap();

    assert!(harness.glove.sent().is_empty());
    assert_eq!(bridge.metrics().commands_sent, 0);
}

#[test]
fn test_start_twice_is_rejected() {
    let harness = Harness::new();
    let mut bridge = harness.builder().build().unwrap();
    bridge.start().unwrap();
    assert!(matches!(bridge.start(), Err(DriverError::AlreadyStarted)));
}

#[test]
fn test_session_commands_respect_config() {
    let mut harness = Harness::new();
    harness.config.send_init_on_start = false;
    harness.config.send_shutdown_on_exit = false;

    let mut bridge = harness.builder().build().unwrap();
    bridge.start().unwrap();
    bridge.shutdown();
    bridge.shutdown();

    assert!(harness.glove.sent().is_empty());
}

#[test]
fn test_closed_glove_socket_ends_receive_loop_only() {
    let harness = Harness::new();
    let mut bridge = harness.builder().build().unwrap();
    bridge.start().unwrap();

    harness.glove.push(&sample_frame(850).to_bytes(), harness.glove_peer());
    harness.glove.close();
    wait_until(|| bridge.frame_log().rows_written() == 1);

    // 接收循环已经退出，shutdown 仍能及时完成
    let started = Instant::now();
    drop(bridge);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_drop_sends_shutdown() {
    let harness = Harness::new();
    let robot = harness.config.robot_addr;
    {
        let mut bridge = harness.builder().build().unwrap();
        bridge.start().unwrap();
    }
    let sent = harness.glove.sent_to(robot);
    assert_eq!(sent.last().unwrap(), &vec![0x5A, 0x5A, 0x09, 0xA5, 0xA5]);
}

#[test]
fn test_builder_creates_unique_logs() {
    let harness = Harness::new();
    let first = harness.builder().build().unwrap();
    let second = harness.builder().build().unwrap();

    assert_eq!(
        first.frame_log().decoded_path().unwrap(),
        harness.dir.path().join("received_data_packet.csv")
    );
    assert_eq!(
        second.frame_log().decoded_path().unwrap(),
        harness.dir.path().join("received_data_packet(1).csv")
    );

    // 显式提供写入器时不创建文件
    let third = harness
        .builder()
        .frame_log(FrameLogWriter::from_writers(
            Box::new(std::io::sink()),
            Box::new(std::io::sink()),
        ))
        .build()
        .unwrap();
    assert!(third.frame_log().decoded_path().is_none());
}
