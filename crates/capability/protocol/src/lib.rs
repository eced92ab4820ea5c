//! # 协议能力模块
//!
//! 每个模拟设备监听一个 TCP 端口，对端通过文本行协议读写设备参数：
//! - **codec**：请求解析与应答编码
//! - **tcp_server**：单设备服务循环（一次只服务一个连接）
//! - **registry**：进程内设备名分配，保证并发创建时名称唯一
//!
//! ## 架构设计
//!
//! ```text
//! DeviceOptions
//!       │
//!       ▼
//! DeviceServer::new ──► NameRegistry::reserve（同步完成）
//!       │
//!       ▼
//! DeviceServer::bind ──► BoundDevice::run（accept 循环）
//!       │
//!       ▼
//! 每行请求 ──► codec::parse_request ──► ParameterStore ──► Response::encode
//! ```
//!
//! ## 报文格式
//!
//! ```text
//! 请求：ACTION:PARAM:VALUE\n      ACTION ∈ {W,R,P}
//! 应答：CODE:PARAM:PAYLOAD\n      CODE ∈ {R,S,P,E}
//! ```

pub mod codec;
mod error;
pub mod registry;
mod tcp_server;

pub use codec::{ErrorCode, MAX_MESSAGE_BYTES, Request, Response, parse_request};
pub use error::ProtocolError;
pub use registry::{DEFAULT_DEVICE_NAME, DeviceRegistry, NameRegistry, RegistryError};
pub use tcp_server::{BoundDevice, DEFAULT_BIND_HOST, DeviceOptions, DeviceServer};
