//! 参数集合：构造后成员固定。

use crate::parameter::{Parameter, ParameterError, ParameterSpec};
use crate::value::ParameterType;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// 设备持有的参数集合，按名称排序。
///
/// 构造后不能增删参数，只能读写已有参数的值。
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    parameters: BTreeMap<String, Parameter>,
}

impl ParameterStore {
    /// 由参数声明构造；任一声明非法或名称重复即失败。
    pub fn from_specs(specs: &[ParameterSpec]) -> Result<Self, ParameterError> {
        let mut parameters = BTreeMap::new();
        for spec in specs {
            let parameter = Parameter::from_spec(spec)?;
            match parameters.entry(parameter.name().to_string()) {
                Entry::Occupied(_) => {
                    return Err(ParameterError::InvalidParameter(format!(
                        "duplicate parameter name {}",
                        spec.name
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(parameter);
                }
            }
        }
        Ok(Self { parameters })
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// 按名称顺序遍历参数。
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }
}

/// 未提供参数声明时设备使用的默认参数。
pub fn default_parameter_specs() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::new("A", ParameterType::Binary),
        ParameterSpec::new("B", ParameterType::Analog).with_initial(10_i64),
        ParameterSpec::new("C", ParameterType::Analog)
            .with_initial(10_i64)
            .with_jitter(0.5, 0.2),
        ParameterSpec::new("D", ParameterType::String).with_initial("mystring"),
    ]
}
