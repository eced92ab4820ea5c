//! 设备参数领域模型。
//!
//! 每个模拟设备持有一组具名、带类型的参数（[`ParameterStore`]）。
//! 数值型参数在每次读取时执行一步有界随机游走，用于模拟传感器噪声。

pub mod parameter;
pub mod store;
pub mod value;

pub use parameter::{DEFAULT_RAND_MUL, DEFAULT_RAND_SUM, Parameter, ParameterError, ParameterSpec};
pub use store::{ParameterStore, default_parameter_specs};
pub use value::{ParameterType, ParameterValue, RawValue};
