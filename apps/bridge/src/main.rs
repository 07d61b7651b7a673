//! 手套遥测桥接主入口
//!
//! 启动后：
//! - 手套数据报中继给伴随进程，并解码写入日志、驱动夹爪
//! - 跟踪样本经标定变换后发送给机器人
//! - Ctrl+C 优雅退出（发送 Shutdown 指令并打印指标）

mod tracking;

use anyhow::{Context, Result};
use clap::Parser;
use glove_driver::{BridgeBuilder, bind_udp};
use glove_tools::BridgeConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{info, warn};

/// 手套遥测桥接
///
/// 接收数据手套的 UDP 遥测帧，转发给伴随进程，驱动机器人夹爪并跟随跟踪坐标
#[derive(Parser, Debug)]
#[command(name = "glove-bridge")]
#[command(about = "Sensor glove to robot controller UDP bridge", long_about = None)]
struct Args {
    /// 配置文件路径（TOML）
    ///
    /// 默认: <config_dir>/glove-bridge/config.toml（存在时加载）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 手套本地端点（覆盖配置）
    #[arg(long)]
    glove_bind: Option<SocketAddr>,

    /// 伴随进程中继 socket 本地端点（覆盖配置）
    #[arg(long)]
    companion_bind: Option<SocketAddr>,

    /// 中继目标（覆盖配置）
    #[arg(long)]
    companion_target: Option<SocketAddr>,

    /// 机器人控制器端点（覆盖配置）
    #[arg(long)]
    robot_addr: Option<SocketAddr>,

    /// 跟踪样本输入端点（覆盖配置）
    #[arg(long)]
    tracking_bind: Option<SocketAddr>,

    /// 日志目录（覆盖配置）
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 打印生效的配置后退出
    #[arg(long)]
    print_config: bool,
}

/// 默认配置文件路径
fn default_config_file() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("glove-bridge");
    path.push("config.toml");
    Some(path)
}

/// 加载配置并应用命令行覆盖
fn resolve_config(args: &Args) -> Result<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => match default_config_file().filter(|p| p.exists()) {
            Some(path) => BridgeConfig::load(&path)?,
            None => BridgeConfig::default(),
        },
    };

    apply_overrides(args, &mut config);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(args: &Args, config: &mut BridgeConfig) {
    if let Some(addr) = args.glove_bind {
        config.glove_bind = addr;
    }
    if let Some(addr) = args.companion_bind {
        config.companion_bind = addr;
    }
    if let Some(addr) = args.companion_target {
        config.companion_target = addr;
    }
    if let Some(addr) = args.robot_addr {
        config.robot_addr = addr;
    }
    if let Some(addr) = args.tracking_bind {
        config.tracking_bind = addr;
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = dir.clone();
    }
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("glove_bridge=info".parse()?)
                .add_directive("glove_driver=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // 设置信号处理（Ctrl+C 优雅退出）
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("设置信号处理失败")?;

    let tracking_socket = bind_udp(config.tracking_bind, config.recv_timeout())
        .with_context(|| format!("绑定跟踪端点失败: {}", config.tracking_bind))?;

    let mut bridge = BridgeBuilder::new()
        .config(config.clone())
        .build()
        .context("创建桥接失败")?;
    let frame_log = bridge.frame_log();
    if let (Some(raw), Some(decoded)) = (frame_log.raw_path(), frame_log.decoded_path()) {
        info!("Logging raw frames to {}", raw.display());
        info!("Logging decoded frames to {}", decoded.display());
    }
    bridge.start()?;
    info!("Tracking samples on {}", config.tracking_bind);
    info!("Press Ctrl+C to stop.");

    let stop = AtomicBool::new(false);
    thread::scope(|scope| {
        let tracking = thread::Builder::new()
            .name("tracking-rx".to_string())
            .spawn_scoped(scope, || tracking::tracking_loop(&tracking_socket, &bridge, &stop));
        if let Err(e) = &tracking {
            warn!("Failed to spawn tracking thread: {}", e);
        }

        if stop_rx.recv().is_err() {
            warn!("Signal channel closed unexpectedly");
        }
        info!("Received interrupt signal. Shutting down...");
        stop.store(true, Ordering::Release);
    });

    bridge.shutdown();
    info!("Final metrics: {:?}", bridge.metrics());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "glove-bridge",
            "--glove-bind",
            "127.0.0.1:7000",
            "--robot-addr",
            "10.0.0.5:1337",
            "--log-dir",
            "/var/log/glove",
        ]);
        assert!(args.config.is_none());

        let mut config = BridgeConfig::default();
        apply_overrides(&args, &mut config);
        assert_eq!(config.glove_bind.to_string(), "127.0.0.1:7000");
        assert_eq!(config.robot_addr.to_string(), "10.0.0.5:1337");
        assert_eq!(config.log_dir, PathBuf::from("/var/log/glove"));
        // 未覆盖的字段保持原值
        assert_eq!(config.companion_target, BridgeConfig::default().companion_target);
    }

    #[test]
    fn test_resolve_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "log_base_name = \"session\"\nrecv_timeout_ms = 50\n").unwrap();

        let args = Args::parse_from([
            "glove-bridge",
            "--config",
            path.to_str().unwrap(),
            "--companion-target",
            "127.0.0.1:9999",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.log_base_name, "session");
        assert_eq!(config.recv_timeout_ms, 50);
        assert_eq!(config.companion_target.to_string(), "127.0.0.1:9999");
    }

    #[test]
    fn test_resolve_config_rejects_missing_file() {
        let args = Args::parse_from(["glove-bridge", "--config", "/nonexistent/bridge.toml"]);
        assert!(resolve_config(&args).is_err());
    }
}
