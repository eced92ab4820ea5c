//! 设备池错误类型定义

use devsim_config::ConfigError;
use devsim_protocol::ProtocolError;
use std::path::PathBuf;

/// 单个设备创建/启动失败的原因
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// 地址文件目录不存在或不是目录
    #[error("address file prefix {} is not a directory", .0.display())]
    AddressDir(PathBuf),

    /// 地址文件写入失败
    #[error("cannot write address file {}: {source}", path.display())]
    AddressFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// 设备构造或绑定失败
    #[error("device error: {0}")]
    Device(#[from] ProtocolError),

    /// 设备描述解析失败
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
