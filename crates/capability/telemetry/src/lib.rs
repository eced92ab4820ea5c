//! 追踪初始化、设备日志阈值与进程级计数器。

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt as subscriber_fmt};

/// 设备默认日志阈值。
pub const DEFAULT_LOG_SEVERITY: u8 = 3;
/// 生命周期事件（注册、绑定、连接）的严重度。
pub const SEVERITY_LIFECYCLE: u8 = 3;
/// 收发报文的严重度。
pub const SEVERITY_TRAFFIC: u8 = 2;

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_accepted: u64,
    pub requests_handled: u64,
    pub error_replies: u64,
    pub rejected_writes: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    connections_accepted: AtomicU64,
    requests_handled: AtomicU64,
    error_replies: AtomicU64,
    rejected_writes: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            connections_accepted: AtomicU64::new(0),
            requests_handled: AtomicU64::new(0),
            error_replies: AtomicU64::new(0),
            rejected_writes: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            requests_handled: self.requests_handled.load(Ordering::Relaxed),
            error_replies: self.error_replies.load(Ordering::Relaxed),
            rejected_writes: self.rejected_writes.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info，可用 RUST_LOG 覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = subscriber_fmt().with_env_filter(filter).try_init();
}

/// 生成新的连接 ID。
pub fn new_connection_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录已接受的连接。
pub fn record_connection_accepted() {
    metrics().connections_accepted.fetch_add(1, Ordering::Relaxed);
}

/// 记录已处理的请求。
pub fn record_request_handled() {
    metrics().requests_handled.fetch_add(1, Ordering::Relaxed);
}

/// 记录错误应答。
pub fn record_error_reply() {
    metrics().error_replies.fetch_add(1, Ordering::Relaxed);
}

/// 记录被拒绝的写入（类型转换失败）。
pub fn record_rejected_write() {
    metrics().rejected_writes.fetch_add(1, Ordering::Relaxed);
}

/// 按设备阈值过滤的日志通道。
///
/// 严重度不低于阈值的消息才会输出，事件携带 `device` 与 `severity` 字段。
#[derive(Debug, Clone)]
pub struct DeviceLog {
    device: String,
    threshold: u8,
}

impl DeviceLog {
    pub fn new(device: impl Into<String>, threshold: u8) -> Self {
        Self {
            device: device.into(),
            threshold,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn enabled(&self, severity: u8) -> bool {
        severity >= self.threshold
    }

    pub fn emit(&self, severity: u8, message: impl fmt::Display) {
        if self.enabled(severity) {
            tracing::info!(device = %self.device, severity, "{}", message);
        }
    }

    pub fn lifecycle(&self, message: impl fmt::Display) {
        self.emit(SEVERITY_LIFECYCLE, message);
    }

    pub fn traffic(&self, message: impl fmt::Display) {
        self.emit(SEVERITY_TRAFFIC, message);
    }
}
