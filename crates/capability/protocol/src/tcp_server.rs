//! 单设备 TCP 服务
//!
//! 构造与启动分两步：
//!
//! ```rust,ignore
//! let registry = DeviceRegistry::new();
//! let server = DeviceServer::new(&registry, DeviceOptions::default())?; // 名称已预留
//! let device = server.bind().await?;                                     // 端口已确定
//! println!("{} on {}", device.name(), device.local_addr());
//! device.spawn();                                                        // 进入 accept 循环
//! ```
//!
//! 每个设备一次只服务一个连接：上一个连接关闭后才接受下一个。

use crate::codec::{ErrorCode, MAX_MESSAGE_BYTES, Request, Response, parse_request};
use crate::error::ProtocolError;
use crate::registry::NameRegistry;
use devsim_telemetry::{
    DEFAULT_LOG_SEVERITY, DeviceLog, new_connection_id, record_connection_accepted,
    record_error_reply, record_rejected_write, record_request_handled,
};
use domain::{ParameterSpec, ParameterStore, default_parameter_specs};
use std::net::SocketAddr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

/// 默认监听地址（所有网卡）。
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// 设备构造参数
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// 请求的基础名称，缺省为 `DeviceSim`
    pub name: Option<String>,
    /// 参数声明，缺省使用内置默认参数
    pub parameters: Option<Vec<ParameterSpec>>,
    /// 固定端口，缺省由系统分配
    pub port: Option<u16>,
    /// 监听地址
    pub bind_host: String,
    /// 日志阈值
    pub log_severity: u8,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            name: None,
            parameters: None,
            port: None,
            bind_host: DEFAULT_BIND_HOST.to_string(),
            log_severity: DEFAULT_LOG_SEVERITY,
        }
    }
}

/// 已构造、尚未绑定端口的设备。
#[derive(Debug)]
pub struct DeviceServer {
    name: String,
    store: ParameterStore,
    port: Option<u16>,
    bind_host: String,
    log: DeviceLog,
}

impl DeviceServer {
    /// 构造设备：先构建参数集合，再同步预留唯一名称。
    pub fn new(registry: &dyn NameRegistry, options: DeviceOptions) -> Result<Self, ProtocolError> {
        let store = match &options.parameters {
            Some(specs) => ParameterStore::from_specs(specs)?,
            None => ParameterStore::from_specs(&default_parameter_specs())?,
        };
        let name = registry.reserve(options.name.as_deref())?;
        let log = DeviceLog::new(name.clone(), options.log_severity);
        log.lifecycle(format_args!("added name {} to devices list", name));

        Ok(Self {
            name,
            store,
            port: options.port,
            bind_host: options.bind_host,
            log,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// 处理一行请求并生成应答。
    pub fn handle_line(&mut self, line: &str) -> Response {
        record_request_handled();
        let response = match parse_request(line) {
            Ok(request) => self.handle_request(request),
            Err(code) => Response::Error(code),
        };
        if response.is_error() {
            record_error_reply();
        }
        response
    }

    /// 将请求应用到参数集合。
    pub fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::PoolStatus => {
                self.dump_parameters();
                Response::StatusOk
            }
            Request::PoolCatalog => {
                Response::Catalog(self.store.iter().map(|param| param.to_string()).collect())
            }
            Request::Read { param } => match self.store.get_mut(&param) {
                Some(parameter) => {
                    let value = parameter.read().to_string();
                    Response::Read { param, value }
                }
                None => Response::Error(ErrorCode::ParamNotFound),
            },
            Request::Write { param, value } => match self.store.get_mut(&param) {
                Some(parameter) => match parameter.write(value.as_str()) {
                    Ok(current) => Response::Set {
                        value: current.to_string(),
                        param,
                    },
                    Err(err) => {
                        record_rejected_write();
                        self.log.lifecycle(format_args!("rejected write to {}: {}", param, err));
                        Response::Error(ErrorCode::BadArgType)
                    }
                },
                None => Response::Error(ErrorCode::ParamNotFound),
            },
        }
    }

    /// 绑定监听端口；未配置端口时由系统分配。
    pub async fn bind(self) -> Result<BoundDevice, ProtocolError> {
        let addr = format!("{}:{}", self.bind_host, self.port.unwrap_or(0));
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        self.log.lifecycle(format_args!("bound socket to {}", local_addr));

        Ok(BoundDevice {
            server: self,
            listener,
            local_addr,
        })
    }

    fn reject_oversized(&self) -> Response {
        record_request_handled();
        record_error_reply();
        Response::Error(ErrorCode::BadProtocolMatch)
    }

    fn dump_parameters(&self) {
        info!(device = %self.name, "parameters from {}:", self.name);
        for parameter in self.store.iter() {
            info!(device = %self.name, "{}", parameter);
        }
    }

    /// 服务单个连接，直到对端关闭或出错。
    async fn serve_connection(&mut self, stream: TcpStream) -> Result<(), ProtocolError> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(MAX_MESSAGE_BYTES);

        loop {
            buf.clear();
            let bytes_read = (&mut reader)
                .take(MAX_MESSAGE_BYTES as u64)
                .read_until(b'\n', &mut buf)
                .await?;

            if bytes_read == 0 {
                debug!(device = %self.name, "connection closed by peer");
                return Ok(());
            }

            // 超长行：丢弃到行尾，整行只回一个错误
            if bytes_read == MAX_MESSAGE_BYTES && buf.last() != Some(&b'\n') {
                discard_line(&mut reader).await?;
                self.log.traffic(format_args!(
                    "from connected user: line longer than {} bytes",
                    MAX_MESSAGE_BYTES
                ));
                let mut answer = self.reject_oversized().encode();
                self.log.traffic(format_args!("to connected user: {}", answer));
                answer.push('\n');
                writer.write_all(answer.as_bytes()).await?;
                continue;
            }

            let message = std::str::from_utf8(&buf)
                .map_err(|err| ProtocolError::Decode(err.to_string()))?;
            let line = message.strip_suffix('\n').unwrap_or(message);
            let line = line.strip_suffix('\r').unwrap_or(line);
            self.log.traffic(format_args!("from connected user: {}", line));

            let mut answer = self.handle_line(line).encode();
            self.log.traffic(format_args!("to connected user: {}", answer));
            answer.push('\n');
            writer.write_all(answer.as_bytes()).await?;
        }
    }
}

/// 丢弃输入直到下一个换行符（含）或连接结束。
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|byte| *byte == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// 已绑定端口的设备。
#[derive(Debug)]
pub struct BoundDevice {
    server: DeviceServer,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundDevice {
    pub fn name(&self) -> &str {
        self.server.name()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// accept 循环，永不返回。连接错误只结束当前连接。
    pub async fn run(mut self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer_addr)) => {
                    record_connection_accepted();
                    self.server
                        .log
                        .lifecycle(format_args!("connection from {}", peer_addr));
                    let span = tracing::info_span!(
                        "connection",
                        device = %self.server.name,
                        connection_id = %new_connection_id(),
                        peer = %peer_addr
                    );
                    if let Err(err) = self.server.serve_connection(stream).instrument(span).await {
                        warn!(device = %self.server.name, "connection from {} terminated: {}", peer_addr, err);
                    }
                }
                Err(err) => {
                    error!(device = %self.server.name, "failed to accept connection: {}", err);
                }
            }
        }
    }

    /// 在独立任务中运行 accept 循环。
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
