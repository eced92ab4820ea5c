//! 设备名注册表
//!
//! 给定基础名 `B`，按 `B0, B1, B2, …` 顺序取第一个未被占用的名称，
//! 检查与插入在同一把锁内完成。名称在进程生命周期内只增不减。
//!
//! 名称集合的每次修改都是单次插入，持锁线程 panic 后集合仍然一致，
//! 因此锁中毒时直接取回内部数据继续使用。

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 未指定名称时使用的基础名。
pub const DEFAULT_DEVICE_NAME: &str = "DeviceSim";

/// 注册表错误
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no free device name left for base {0}")]
    Exhausted(String),
}

/// 设备名分配抽象。
pub trait NameRegistry: Send + Sync {
    /// 预留一个唯一名称；`base` 为空或缺省时使用 [`DEFAULT_DEVICE_NAME`]。
    fn reserve(&self, base: Option<&str>) -> Result<String, RegistryError>;
}

/// 进程内设备名注册表。
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    names: Mutex<HashSet<String>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 已分配名称（排序后）。
    pub fn names(&self) -> Vec<String> {
        let mut list: Vec<String> = self.lock().iter().cloned().collect();
        list.sort();
        list
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NameRegistry for DeviceRegistry {
    fn reserve(&self, base: Option<&str>) -> Result<String, RegistryError> {
        let base = match base {
            Some(base) if !base.is_empty() => base,
            _ => DEFAULT_DEVICE_NAME,
        };
        let mut names = self.lock();
        for suffix in 0..=u64::MAX {
            let candidate = format!("{}{}", base, suffix);
            if !names.contains(&candidate) {
                names.insert(candidate.clone());
                return Ok(candidate);
            }
        }
        Err(RegistryError::Exhausted(base.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_suffix() {
        let registry = DeviceRegistry::new();
        assert_eq!(registry.reserve(None).unwrap(), "DeviceSim0");
        assert_eq!(registry.reserve(None).unwrap(), "DeviceSim1");
        assert_eq!(registry.reserve(Some("pump")).unwrap(), "pump0");
        assert_eq!(registry.reserve(Some("")).unwrap(), "DeviceSim2");
        assert_eq!(registry.len(), 4);
        assert!(registry.contains("pump0"));
    }

    #[test]
    fn poisoned_lock_keeps_serving() {
        let registry = DeviceRegistry::new();
        registry.reserve(Some("pump")).unwrap();

        let poisoner = std::thread::scope(|scope| {
            let holder: std::thread::ScopedJoinHandle<'_, ()> = scope.spawn(|| {
                let _guard = registry.names.lock().unwrap();
                panic!("holder panics");
            });
            holder.join()
        });
        assert!(poisoner.is_err());
        assert!(registry.names.is_poisoned());

        assert!(registry.contains("pump0"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.reserve(Some("pump")).unwrap(), "pump1");
        assert_eq!(registry.names(), vec!["pump0".to_string(), "pump1".to_string()]);
    }

    #[test]
    fn skips_names_taken_by_other_bases() {
        let registry = DeviceRegistry::new();
        assert_eq!(registry.reserve(Some("dev1")).unwrap(), "dev10");
        for expected in ["dev0", "dev1", "dev2", "dev3", "dev4", "dev5", "dev6", "dev7", "dev8", "dev9"] {
            assert_eq!(registry.reserve(Some("dev")).unwrap(), expected);
        }
        assert_eq!(registry.reserve(Some("dev")).unwrap(), "dev11");
    }
}
