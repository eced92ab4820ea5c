//! 设备池
//!
//! ```text
//! AppConfig + DeviceFile
//!        │
//!        ▼
//! DevicePool::build   ── 预留名称（同步）
//!        │
//!        ▼
//! DevicePool::start   ── 绑定端口 → 地址文件 → tokio::spawn
//!        │
//!        ▼
//! RunningPool         ── drop / shutdown 时终止任务、删除地址文件
//! ```

mod address_file;
mod error;
mod pool;

pub use address_file::AddressFile;
pub use error::PoolError;
pub use pool::{DeviceFailure, DevicePool, PoolOptions, RunningDevice, RunningPool};
