//! 协议错误类型定义

use crate::registry::RegistryError;
use domain::ParameterError;

/// 设备构造与服务错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// IO 错误（绑定、读写、连接重置）
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 设备名分配失败
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// 参数声明不合法
    #[error("parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// 报文解码失败
    #[error("decode error: {0}")]
    Decode(String),
}
