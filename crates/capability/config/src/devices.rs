//! 设备描述文件。
//!
//! ```yaml
//! Devices:
//!   pump:
//!     port: 9000
//!     log: 2
//!     Params:
//!       pressure: { type: a, init: 1.5, randsum: 0.05, randmul: 0.01 }
//!       running: { type: b, init: true }
//!   meter:
//!     source: meter_params.yaml   # { Params: ... }，相对描述文件所在目录
//! ```
//!
//! `Params` 也可以写成带 `name` 键的列表。未知键一律拒绝。

use crate::ConfigError;
use domain::{ParameterSpec, ParameterType, RawValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// 设备描述文件顶层结构。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceFile {
    #[serde(rename = "Devices", default)]
    pub devices: BTreeMap<String, DeviceEntry>,
    /// 相对路径的解析基准（描述文件所在目录）。
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// 单个设备条目。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceEntry {
    /// 参数描述文件
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// 固定端口
    #[serde(default)]
    pub port: Option<u16>,
    /// 日志阈值
    #[serde(default)]
    pub log: Option<u8>,
    /// 地址文件目录（覆盖全局设置）
    #[serde(default)]
    pub portfile: Option<PathBuf>,
    /// 内联参数
    #[serde(rename = "Params", default)]
    pub params: Option<ParamsSection>,
}

/// 参数描述文件（`source` 指向的文件）。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterFile {
    #[serde(rename = "Params")]
    pub params: ParamsSection,
}

/// 参数段：名称到条目的映射，或带 `name` 的条目列表。
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParamsSection {
    Map(BTreeMap<String, Option<ParamEntry>>),
    List(Vec<NamedParamEntry>),
}

/// 映射形式的参数条目。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<ParameterType>,
    #[serde(default)]
    pub init: Option<RawValue>,
    #[serde(default)]
    pub randsum: Option<f64>,
    #[serde(default)]
    pub randmul: Option<f64>,
}

/// 列表形式的参数条目。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedParamEntry {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<ParameterType>,
    #[serde(default)]
    pub init: Option<RawValue>,
    #[serde(default)]
    pub randsum: Option<f64>,
    #[serde(default)]
    pub randmul: Option<f64>,
}

/// 解析后的设备定义，可直接用于构造设备。
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDefinition {
    pub name: String,
    /// `None` 表示使用默认参数
    pub parameters: Option<Vec<ParameterSpec>>,
    pub port: Option<u16>,
    pub log_severity: Option<u8>,
    pub portfile: Option<PathBuf>,
}

impl ParamsSection {
    /// 转换为参数声明；列表形式中的重复名称视为结构错误。
    pub fn to_specs(&self) -> Result<Vec<ParameterSpec>, ConfigError> {
        match self {
            Self::Map(entries) => Ok(entries
                .iter()
                .map(|(name, entry)| {
                    let entry = entry.clone().unwrap_or_default();
                    spec(name, entry.kind, entry.init, entry.randsum, entry.randmul)
                })
                .collect()),
            Self::List(entries) => {
                let mut seen = BTreeSet::new();
                for entry in entries {
                    if !seen.insert(entry.name.as_str()) {
                        return Err(ConfigError::Schema(format!(
                            "duplicate parameter {}",
                            entry.name
                        )));
                    }
                }
                Ok(entries
                    .iter()
                    .map(|entry| {
                        spec(
                            &entry.name,
                            entry.kind,
                            entry.init.clone(),
                            entry.randsum,
                            entry.randmul,
                        )
                    })
                    .collect())
            }
        }
    }
}

fn spec(
    name: &str,
    kind: Option<ParameterType>,
    initial: Option<RawValue>,
    rand_sum: Option<f64>,
    rand_mul: Option<f64>,
) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        kind,
        initial,
        rand_sum,
        rand_mul,
    }
}

impl ParameterFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_document(path)
    }
}

impl DeviceFile {
    /// 读取并校验设备描述文件（`.json` 按 JSON 解析，其余按 YAML）。
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut file: Self = load_document(path)?;
        file.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(file)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|err| ConfigError::Schema(err.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|err| ConfigError::Schema(err.to_string()))
    }

    /// 逐个解析设备定义；单个设备失败不影响其他设备。
    pub fn definitions(&self) -> Vec<(String, Result<DeviceDefinition, ConfigError>)> {
        self.devices
            .iter()
            .map(|(name, entry)| (name.clone(), self.definition(name, entry)))
            .collect()
    }

    /// 解析单个设备：`source` 中的参数在前，内联参数覆盖同名项。
    pub fn definition(&self, name: &str, entry: &DeviceEntry) -> Result<DeviceDefinition, ConfigError> {
        let mut merged: Option<BTreeMap<String, ParameterSpec>> = None;

        if let Some(source) = &entry.source {
            let path = self.resolve(source);
            let file = ParameterFile::load(&path)?;
            let specs = merged.get_or_insert_with(BTreeMap::new);
            for spec in file.params.to_specs()? {
                specs.insert(spec.name.clone(), spec);
            }
        }

        if let Some(params) = &entry.params {
            let specs = merged.get_or_insert_with(BTreeMap::new);
            for spec in params.to_specs()? {
                specs.insert(spec.name.clone(), spec);
            }
        }

        Ok(DeviceDefinition {
            name: name.to_string(),
            parameters: merged.map(|specs| specs.into_values().collect()),
            port: entry.port,
            log_severity: entry.log,
            portfile: entry.portfile.as_ref().map(|dir| self.resolve(dir)),
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(&content).map_err(|err| err.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|err| err.to_string())
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
