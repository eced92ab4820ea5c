//! 设备池：构造 → 启动 → 关闭
//!
//! 构造阶段同步预留全部名称；启动阶段逐个绑定端口、写地址文件并进入服务循环。
//! 任何单个设备的失败只记录到失败列表，不影响其他设备。

use crate::address_file::AddressFile;
use crate::error::PoolError;
use devsim_config::{AppConfig, DEFAULT_LOG_SEVERITY, DeviceFile};
use devsim_protocol::{
    DEFAULT_BIND_HOST, DEFAULT_DEVICE_NAME, DeviceOptions, DeviceServer, NameRegistry,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 设备池参数
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// 默认设备数量
    pub number: usize,
    /// 默认日志阈值（配置条目未指定时也使用）
    pub log_severity: u8,
    /// 全局地址文件目录
    pub portfile: Option<PathBuf>,
    pub bind_host: String,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            number: 0,
            log_severity: DEFAULT_LOG_SEVERITY,
            portfile: None,
            bind_host: DEFAULT_BIND_HOST.to_string(),
        }
    }
}

impl From<&AppConfig> for PoolOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            number: config.number,
            log_severity: config.log_severity,
            portfile: config.portfile.clone(),
            ..Self::default()
        }
    }
}

/// 创建或启动失败的设备
#[derive(Debug)]
pub struct DeviceFailure {
    /// 设备名（未预留成功时为请求的名称）
    pub name: String,
    pub error: PoolError,
}

#[derive(Debug)]
struct PendingDevice {
    server: DeviceServer,
    portfile: Option<PathBuf>,
}

/// 已构造、尚未启动的设备池。
#[derive(Debug)]
pub struct DevicePool {
    pending: Vec<PendingDevice>,
    failures: Vec<DeviceFailure>,
}

impl DevicePool {
    /// 先构造 `number` 个默认设备，再按描述文件逐个构造设备。
    pub fn build(
        registry: &dyn NameRegistry,
        options: &PoolOptions,
        file: Option<&DeviceFile>,
    ) -> Self {
        let mut pool = Self {
            pending: Vec::new(),
            failures: Vec::new(),
        };

        for _ in 0..options.number {
            let device = DeviceOptions {
                bind_host: options.bind_host.clone(),
                log_severity: options.log_severity,
                ..DeviceOptions::default()
            };
            pool.construct(registry, device, options.portfile.clone());
        }

        if let Some(file) = file {
            for (name, definition) in file.definitions() {
                let definition = match definition {
                    Ok(definition) => definition,
                    Err(err) => {
                        pool.fail(name, err.into());
                        continue;
                    }
                };
                let device = DeviceOptions {
                    name: Some(definition.name),
                    parameters: definition.parameters,
                    port: definition.port,
                    bind_host: options.bind_host.clone(),
                    log_severity: definition.log_severity.unwrap_or(options.log_severity),
                };
                let portfile = definition.portfile.or_else(|| options.portfile.clone());
                pool.construct(registry, device, portfile);
            }
        }

        pool
    }

    /// 已构造设备的名称（按构造顺序）。
    pub fn names(&self) -> Vec<&str> {
        self.pending.iter().map(|device| device.server.name()).collect()
    }

    pub fn failures(&self) -> &[DeviceFailure] {
        &self.failures
    }

    /// 启动全部设备。
    pub async fn start(self) -> RunningPool {
        let mut running = RunningPool {
            devices: Vec::with_capacity(self.pending.len()),
            failures: self.failures,
        };

        for PendingDevice { server, portfile } in self.pending {
            let name = server.name().to_string();
            let bound = match server.bind().await {
                Ok(bound) => bound,
                Err(err) => {
                    running.fail(name, err.into());
                    continue;
                }
            };
            let addr = bound.local_addr();

            let address_file = match portfile {
                Some(dir) => match AddressFile::create(&dir, &name, addr) {
                    Ok(file) => {
                        info!(device = %name, "wrote address file {}", file.path().display());
                        Some(file)
                    }
                    Err(err) => {
                        running.fail(name, err);
                        continue;
                    }
                },
                None => None,
            };

            info!(device = %name, "device listening on {}", addr);
            running.devices.push(RunningDevice {
                name,
                addr,
                handle: bound.spawn(),
                _address_file: address_file,
            });
        }

        running
    }

    fn construct(
        &mut self,
        registry: &dyn NameRegistry,
        device: DeviceOptions,
        portfile: Option<PathBuf>,
    ) {
        let requested = device
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());
        match DeviceServer::new(registry, device) {
            Ok(server) => self.pending.push(PendingDevice { server, portfile }),
            Err(err) => self.fail(requested, err.into()),
        }
    }

    fn fail(&mut self, name: String, error: PoolError) {
        error!(device = %name, "failed to create device: {}", error);
        self.failures.push(DeviceFailure { name, error });
    }
}

/// 运行中的设备
#[derive(Debug)]
pub struct RunningDevice {
    name: String,
    addr: SocketAddr,
    handle: JoinHandle<()>,
    // 释放时删除地址文件
    _address_file: Option<AddressFile>,
}

impl RunningDevice {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

/// 运行中的设备池。释放时终止所有设备任务并删除地址文件。
#[derive(Debug)]
pub struct RunningPool {
    devices: Vec<RunningDevice>,
    failures: Vec<DeviceFailure>,
}

impl RunningPool {
    pub fn devices(&self) -> &[RunningDevice] {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Option<&RunningDevice> {
        self.devices.iter().find(|device| device.name == name)
    }

    pub fn failures(&self) -> &[DeviceFailure] {
        &self.failures
    }

    /// 终止所有设备任务，删除地址文件。
    pub fn shutdown(mut self) {
        self.stop_all();
    }

    fn stop_all(&mut self) {
        for device in self.devices.drain(..) {
            device.handle.abort();
            info!(device = %device.name, "device stopped");
        }
    }

    fn fail(&mut self, name: String, error: PoolError) {
        error!(device = %name, "failed to start device: {}", error);
        self.failures.push(DeviceFailure { name, error });
    }
}

impl Drop for RunningPool {
    fn drop(&mut self) {
        self.stop_all();
    }
}
