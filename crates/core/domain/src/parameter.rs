//! 单个参数：类型化取值、随机游走读取与类型转换写入。

use crate::value::{ParameterType, ParameterValue, RawValue};
use rand::Rng;
use std::fmt;

/// 默认加性抖动幅度。
pub const DEFAULT_RAND_SUM: f64 = 0.1;
/// 默认乘性抖动幅度。
pub const DEFAULT_RAND_MUL: f64 = 0.1;

/// 参数错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// 参数声明不合法（缺少名称、初始值类型不符、抖动幅度非法等）。
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// 写入值无法转换为参数类型。
    #[error("bad value {value} for {expected} parameter")]
    BadArgType {
        value: String,
        expected: ParameterType,
    },
}

/// 参数声明：描述文件中的一项（结构已由加载器校验）。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSpec {
    pub name: String,
    /// 缺省为 analog。
    pub kind: Option<ParameterType>,
    pub initial: Option<RawValue>,
    pub rand_sum: Option<f64>,
    pub rand_mul: Option<f64>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_initial(mut self, initial: impl Into<RawValue>) -> Self {
        self.initial = Some(initial.into());
        self
    }

    pub fn with_jitter(mut self, rand_sum: f64, rand_mul: f64) -> Self {
        self.rand_sum = Some(rand_sum);
        self.rand_mul = Some(rand_mul);
        self
    }
}

/// 设备参数。
///
/// 不变式：`current` 的变体始终与 `kind` 一致；写入失败不改变 `current`。
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    kind: ParameterType,
    initial: ParameterValue,
    current: ParameterValue,
    rand_sum: f64,
    rand_mul: f64,
}

impl Parameter {
    /// 由参数声明构造。
    pub fn from_spec(spec: &ParameterSpec) -> Result<Self, ParameterError> {
        if spec.name.trim().is_empty() {
            return Err(ParameterError::InvalidParameter(
                "parameter needs a name".to_string(),
            ));
        }
        let kind = spec.kind.unwrap_or_default();
        let rand_sum = jitter_bound(&spec.name, "randsum", spec.rand_sum, DEFAULT_RAND_SUM)?;
        let rand_mul = jitter_bound(&spec.name, "randmul", spec.rand_mul, DEFAULT_RAND_MUL)?;
        let initial = match &spec.initial {
            None => kind.default_value(),
            Some(raw) => kind.coerce(raw).ok_or_else(|| {
                ParameterError::InvalidParameter(format!(
                    "initial value {} not allowed for {} parameter {}",
                    raw, kind, spec.name
                ))
            })?,
        };

        Ok(Self {
            name: spec.name.clone(),
            kind,
            current: initial.clone(),
            initial,
            rand_sum,
            rand_mul,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParameterType {
        self.kind
    }

    pub fn initial(&self) -> &ParameterValue {
        &self.initial
    }

    pub fn rand_sum(&self) -> f64 {
        self.rand_sum
    }

    pub fn rand_mul(&self) -> f64 {
        self.rand_mul
    }

    /// 当前存储值，不施加抖动也不修改状态。
    pub fn peek(&self) -> &ParameterValue {
        &self.current
    }

    /// 读取参数值。
    ///
    /// 对 analog/integer 参数，读取会执行一步随机游走并**替换**存储值：
    /// `next = current * U(1 - randmul, 1 + randmul) + U(-randsum, randsum)`。
    /// 连续读取会持续漂移。binary/string 参数的读取不修改状态。
    pub fn read(&mut self) -> ParameterValue {
        self.read_with(&mut rand::thread_rng())
    }

    /// 同 [`Parameter::read`]，使用调用方提供的随机源。
    pub fn read_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ParameterValue {
        let next = match &self.current {
            ParameterValue::Analog(prev) => ParameterValue::Analog(self.step(rng, *prev)),
            ParameterValue::Integer(prev) => ParameterValue::Integer(self.integer_step(rng, *prev)),
            _ => return self.current.clone(),
        };
        self.current = next;
        self.current.clone()
    }

    /// 写入新值（转换为参数类型）。写入不施加抖动。
    pub fn write(&mut self, value: impl Into<RawValue>) -> Result<&ParameterValue, ParameterError> {
        let raw = value.into();
        let coerced = self
            .kind
            .coerce(&raw)
            .ok_or_else(|| ParameterError::BadArgType {
                value: raw.to_string(),
                expected: self.kind,
            })?;
        self.current = coerced;
        Ok(&self.current)
    }

    // 在单位区间上采样再缩放，任意有限幅度都不会使采样区间溢出。
    // 结果溢出为非有限值时保持原值。
    fn step<R: Rng + ?Sized>(&self, rng: &mut R, prev: f64) -> f64 {
        let mul = 1.0 + self.rand_mul * rng.gen_range(-1.0_f64..=1.0);
        let sum = self.rand_sum * rng.gen_range(-1.0_f64..=1.0);
        let next = prev * mul + sum;
        if next.is_finite() { next } else { prev }
    }

    // 取整后限制在本步的整数区间内；该区间总包含 prev，因此非空。
    fn integer_step<R: Rng + ?Sized>(&self, rng: &mut R, prev: i64) -> i64 {
        let prev = prev as f64;
        let low = prev * (1.0 - self.rand_mul);
        let high = prev * (1.0 + self.rand_mul);
        let min = (low.min(high) - self.rand_sum).ceil();
        let max = (low.max(high) + self.rand_sum).floor();
        self.step(rng, prev).round().max(min).min(max) as i64
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, type: {}, current value: {}, initial value: {}, randsum: {}, randmul: {}",
            self.name, self.kind, self.current, self.initial, self.rand_sum, self.rand_mul
        )
    }
}

fn jitter_bound(
    name: &str,
    field: &str,
    value: Option<f64>,
    default: f64,
) -> Result<f64, ParameterError> {
    let value = value.unwrap_or(default);
    if !value.is_finite() || value < 0.0 {
        return Err(ParameterError::InvalidParameter(format!(
            "{} of parameter {} must be a non-negative number, got {}",
            field, name, value
        )));
    }
    Ok(value)
}
