//! 设备模拟器进程。
//!
//! ```bash
//! # 启动 3 个默认设备，地址写入 /tmp/ports
//! device-sim -n 3 -p /tmp/ports
//!
//! # 按描述文件创建设备，并打开收发报文日志
//! device-sim -s devices.yaml -l 2
//! ```
//!
//! 命令行参数优先于环境变量（`DEVSIM_*`，可放在 `.env` 中）。

use clap::Parser;
use devsim_config::{AppConfig, DeviceFile};
use devsim_pool::{DevicePool, PoolOptions};
use devsim_protocol::DeviceRegistry;
use devsim_telemetry::{init_tracing, metrics};
use std::path::PathBuf;
use tracing::{info, warn};

/// 网络设备模拟器
#[derive(Parser, Debug)]
#[command(name = "device-sim")]
#[command(about = "Simulated network devices speaking a line-oriented text protocol")]
#[command(version)]
struct Args {
    /// 设备描述文件（YAML 或 JSON）
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// 额外创建的默认设备数量
    #[arg(short, long)]
    number: Option<usize>,

    /// 设备日志阈值（2 = 收发报文，3 = 生命周期）
    #[arg(short, long)]
    log_severity: Option<u8>,

    /// 地址文件目录
    #[arg(short, long)]
    portfile: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(source) = self.source {
            config.source = Some(source);
        }
        if let Some(number) = self.number {
            config.number = number;
        }
        if let Some(log_severity) = self.log_severity {
            config.log_severity = log_severity;
        }
        if let Some(portfile) = self.portfile {
            config.portfile = Some(portfile);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let mut config = AppConfig::from_env()?;
    Args::parse().apply(&mut config);
    init_tracing();

    if !config.has_devices() {
        info!("no devices requested, nothing to do");
        return Ok(());
    }

    // 描述文件整体无法读取时直接退出；单个设备的错误由设备池隔离
    let file = match &config.source {
        Some(path) => Some(DeviceFile::load(path)?),
        None => None,
    };

    // 在写出地址文件之前注册退出信号
    let shutdown = ShutdownSignal::install()?;

    let registry = DeviceRegistry::new();
    let pool = DevicePool::build(&registry, &PoolOptions::from(&config), file.as_ref())
        .start()
        .await;

    for device in pool.devices() {
        info!(device = %device.name(), "serving on {}", device.local_addr());
    }
    if !pool.failures().is_empty() {
        warn!("{} device(s) failed to start", pool.failures().len());
    }

    shutdown.wait().await?;
    info!("shutting down");
    pool.shutdown();

    let snapshot = metrics().snapshot();
    info!(
        connections = snapshot.connections_accepted,
        requests = snapshot.requests_handled,
        error_replies = snapshot.error_replies,
        rejected_writes = snapshot.rejected_writes,
        "device-sim stopped"
    );
    Ok(())
}

/// 退出信号：Ctrl-C，或（Unix 上）SIGTERM。
///
/// SIGTERM 处理在 `install` 时立即注册，此后收到的信号不会直接终止进程。
struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    #[cfg(unix)]
    async fn wait(mut self) -> std::io::Result<()> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = self.terminate.recv() => {
                info!("received SIGTERM");
                Ok(())
            }
        }
    }

    #[cfg(not(unix))]
    async fn wait(self) -> std::io::Result<()> {
        tokio::signal::ctrl_c().await
    }
}
