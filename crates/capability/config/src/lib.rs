//! 模拟器运行配置加载。
//!
//! - [`AppConfig`]：从环境变量读取进程级配置
//! - [`DeviceFile`]：YAML/JSON 设备描述文件（含结构校验）

mod devices;

pub use devices::{
    DeviceDefinition, DeviceEntry, DeviceFile, NamedParamEntry, ParamEntry, ParameterFile,
    ParamsSection,
};

pub use devsim_telemetry::DEFAULT_LOG_SEVERITY;

use std::env;
use std::path::PathBuf;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("schema error: {0}")]
    Schema(String),
}

/// 进程运行配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// 设备描述文件
    pub source: Option<PathBuf>,
    /// 额外创建的默认设备数量
    pub number: usize,
    /// 默认设备的日志阈值
    pub log_severity: u8,
    /// 地址文件目录
    pub portfile: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: None,
            number: 0,
            log_severity: DEFAULT_LOG_SEVERITY,
            portfile: None,
        }
    }
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = read_optional("DEVSIM_SOURCE").map(PathBuf::from);
        let number = read_usize_with_default("DEVSIM_NUMBER", 0)?;
        let log_severity = read_u8_with_default("DEVSIM_LOG_SEVERITY", DEFAULT_LOG_SEVERITY)?;
        let portfile = read_optional("DEVSIM_PORTFILE").map(PathBuf::from);

        Ok(Self {
            source,
            number,
            log_severity,
            portfile,
        })
    }

    /// 是否有设备需要创建。
    pub fn has_devices(&self) -> bool {
        self.number > 0 || self.source.is_some()
    }
}

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
