//! 地址文件：`<dir>/<device>.port`，内容为 `<host>:<port>`（IPv6 地址带方括号，如 `[::1]:4100`）。
//!
//! 同名文件已存在时依次尝试 `<device>-1.port`、`<device>-2.port` …
//! 文件在 [`AddressFile`] 释放时删除（尽力而为）。

use crate::error::PoolError;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct AddressFile {
    path: PathBuf,
}

impl AddressFile {
    /// 在 `dir` 下写入设备地址。`dir` 必须是已存在的目录。
    pub fn create(dir: &Path, device: &str, addr: SocketAddr) -> Result<Self, PoolError> {
        if !dir.is_dir() {
            return Err(PoolError::AddressDir(dir.to_path_buf()));
        }

        let mut counter = 0u32;
        loop {
            let path = if counter == 0 {
                dir.join(format!("{}.port", device))
            } else {
                dir.join(format!("{}-{}.port", device, counter))
            };

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    return match write!(file, "{}", addr) {
                        Ok(()) => Ok(Self { path }),
                        Err(source) => {
                            let _ = std::fs::remove_file(&path);
                            Err(PoolError::AddressFile { path, source })
                        }
                    };
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(source) => return Err(PoolError::AddressFile { path, source }),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AddressFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
