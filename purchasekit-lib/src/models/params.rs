//! Flat analytics parameter bags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Analytics parameters keyed by name, ordered for deterministic output.
pub type Params = BTreeMap<String, ParamValue>;

/// A single analytics parameter value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Text value.
    String(String),
    /// Integral value (counts, epoch values).
    Number(i64),
    /// Flag value.
    Bool(bool),
}

impl ParamValue {
    /// Get the value as a string slice if it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if it is numeric.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a flag if it is boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        Self::Number(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Insert `value` under `key` only when it is present.
pub(crate) fn insert_some<V: Into<ParamValue>>(params: &mut Params, key: String, value: Option<V>) {
    if let Some(value) = value {
        params.insert(key, value.into());
    }
}

/// Build a single-entry bag.
pub fn param(key: impl Into<String>, value: impl Into<ParamValue>) -> Params {
    let mut params = Params::new();
    params.insert(key.into(), value.into());
    params
}
