//! 参数类型、参数值与未定型输入值。

use serde::Deserialize;
use std::fmt;

/// 参数类型。
///
/// 描述文件中使用单字母标签：`b`（binary）、`a`（analog）、`i`（integer）、`s`（string）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum ParameterType {
    #[serde(rename = "b")]
    Binary,
    #[default]
    #[serde(rename = "a")]
    Analog,
    #[serde(rename = "i")]
    Integer,
    #[serde(rename = "s")]
    String,
}

impl ParameterType {
    /// 由单字母标签解析。
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "b" => Some(Self::Binary),
            "a" => Some(Self::Analog),
            "i" => Some(Self::Integer),
            "s" => Some(Self::String),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Binary => "b",
            Self::Analog => "a",
            Self::Integer => "i",
            Self::String => "s",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Analog => "analog",
            Self::Integer => "integer",
            Self::String => "string",
        }
    }

    /// 是否参与随机抖动。
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Analog | Self::Integer)
    }

    /// 未给出初始值时的默认值。
    pub fn default_value(self) -> ParameterValue {
        match self {
            Self::Binary => ParameterValue::Binary(false),
            Self::Analog => ParameterValue::Analog(0.0),
            Self::Integer => ParameterValue::Integer(0),
            Self::String => ParameterValue::String(String::new()),
        }
    }

    /// 将输入值转换为本类型的值；无法转换时返回 `None`。
    pub fn coerce(self, raw: &RawValue) -> Option<ParameterValue> {
        match self {
            Self::Binary => coerce_binary(raw).map(ParameterValue::Binary),
            Self::Analog => coerce_analog(raw).map(ParameterValue::Analog),
            Self::Integer => coerce_integer(raw).map(ParameterValue::Integer),
            Self::String => Some(ParameterValue::String(raw.to_string())),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn coerce_binary(raw: &RawValue) -> Option<bool> {
    match raw {
        RawValue::Bool(value) => Some(*value),
        RawValue::Int(0) => Some(false),
        RawValue::Int(1) => Some(true),
        RawValue::Text(text) => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_analog(raw: &RawValue) -> Option<f64> {
    let value = match raw {
        RawValue::Int(value) => *value as f64,
        RawValue::Float(value) => *value,
        RawValue::Text(text) => text.parse::<f64>().ok()?,
        RawValue::Bool(_) => return None,
    };
    value.is_finite().then_some(value)
}

fn coerce_integer(raw: &RawValue) -> Option<i64> {
    match raw {
        RawValue::Int(value) => Some(*value),
        RawValue::Float(value) => whole_number(*value),
        RawValue::Text(text) => match text.parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => whole_number(text.parse::<f64>().ok()?),
        },
        RawValue::Bool(_) => None,
    }
}

fn whole_number(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

/// 参数的当前值，变体与 [`ParameterType`] 一一对应。
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Binary(bool),
    Analog(f64),
    Integer(i64),
    String(String),
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterType {
        match self {
            Self::Binary(_) => ParameterType::Binary,
            Self::Analog(_) => ParameterType::Analog,
            Self::Integer(_) => ParameterType::Integer,
            Self::String(_) => ParameterType::String,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(value) => write!(f, "{}", value),
            Self::Analog(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::String(value) => f.write_str(value),
        }
    }
}

/// 未定型的输入值：描述文件中的标量，或协议报文中的文本。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
