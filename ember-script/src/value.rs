//! Runtime parameter values and their declared kinds.
//!
//! A script declares a parameter bag type (field name → [`ValueKind`]); at
//! invocation time the host hands it a concrete bag (field name →
//! [`ParameterValue`]). The resolver in [`crate::resolver`] connects the two
//! to the descriptor model.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::effects::EffectList;

/// A concrete parameter value as seen by a running script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ParameterValue>),
    EffectList(EffectList),
    /// Escape hatch for values outside the closed set.
    Other(Value),
}

impl ParameterValue {
    /// The declared kind this value belongs to.
    pub fn kind(&self) -> ValueKind {
        match self {
            ParameterValue::Bool(_) => ValueKind::Bool,
            ParameterValue::Number(_) => ValueKind::Number,
            ParameterValue::String(_) => ValueKind::String,
            ParameterValue::List(_) => ValueKind::List,
            ParameterValue::EffectList(_) => ValueKind::EffectList,
            ParameterValue::Other(_) => ValueKind::Other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_owned())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

/// The value type a script declares for one parameter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Bool,
    List,
    EffectList,
    /// Anything outside the closed set of shapes.
    Other,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Bool => "boolean",
            ValueKind::List => "list",
            ValueKind::EffectList => "effectlist",
            ValueKind::Other => "other",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ValueKind::String),
            "number" => Ok(ValueKind::Number),
            "boolean" | "bool" => Ok(ValueKind::Bool),
            "list" | "array" => Ok(ValueKind::List),
            "effectlist" => Ok(ValueKind::EffectList),
            "other" | "any" => Ok(ValueKind::Other),
            other => Err(format!("unknown value kind `{other}`")),
        }
    }
}

/// A concrete parameter bag: resolved field values, in declaration order.
pub type ParameterBag = IndexMap<String, ParameterValue>;

/// A declared parameter bag type: field name → value kind.
pub type BagType = IndexMap<String, ValueKind>;
