use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MlError, MlResult};

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    /// Explicit "no value", e.g. an unbounded tree depth.
    None,
}

/// One hyperparameter configuration, keyed by `step__param` names.
///
/// Ordered so configurations print and iterate deterministically.
pub type ParamSet = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// Numeric view; integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParamValue::None)
    }

    /// Float value for parameter `name`, or an `InvalidParameter` error.
    pub fn expect_float(&self, name: &str) -> MlResult<f64> {
        self.as_float()
            .ok_or_else(|| MlError::invalid_param(name, format!("expected a number, got {}", self)))
    }

    /// Non-negative integer value for parameter `name`.
    pub fn expect_usize(&self, name: &str) -> MlResult<usize> {
        match self.as_int() {
            Some(v) if v >= 0 => Ok(v as usize),
            _ => Err(MlError::invalid_param(
                name,
                format!("expected a non-negative integer, got {}", self),
            )),
        }
    }

    pub fn expect_str(&self, name: &str) -> MlResult<&str> {
        self.as_str()
            .ok_or_else(|| MlError::invalid_param(name, format!("expected a string, got {}", self)))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => write!(f, "'{}'", s),
            ParamValue::None => write!(f, "None"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::None, Into::into)
    }
}

/// Render a configuration as `{name: value, ...}`.
pub fn format_params(params: &ParamSet) -> String {
    let body: Vec<String> = params.iter().map(|(k, v)| format!("'{}': {}", k, v)).collect();
    format!("{{{}}}", body.join(", "))
}

/// Split `step__param` into `("step", "param")`.
pub fn split_param_name(name: &str) -> MlResult<(&str, &str)> {
    name.split_once("__")
        .filter(|(step, param)| !step.is_empty() && !param.is_empty())
        .ok_or_else(|| MlError::UnknownParameter(name.to_string()))
}
