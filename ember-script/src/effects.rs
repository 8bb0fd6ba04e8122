//! Opaque effect and trigger records.
//!
//! Effects are host-executed actions a script requests through its run
//! result; triggers are the events that caused an invocation. Both are
//! opaque to the contract: the host's effect and event subsystems give them
//! meaning, this crate only carries their shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single host effect. Everything except the type tag is passed through
/// untouched to the host's effect runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(rename = "type")]
    pub effect_type: String,
    #[serde(flatten)]
    pub data: serde_json::Map<String, Value>,
}

impl Effect {
    pub fn new(effect_type: impl Into<String>) -> Self {
        Self {
            effect_type: effect_type.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// A nested, orderable list of effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub list: Vec<Effect>,
}

/// The effects a run result carries back to the host: either a flat ordered
/// sequence or a nested effect list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EffectsPayload {
    List(Vec<Effect>),
    Nested(EffectList),
}

impl Default for EffectsPayload {
    fn default() -> Self {
        EffectsPayload::List(Vec::new())
    }
}

impl EffectsPayload {
    /// Number of individual effects, regardless of shape.
    pub fn len(&self) -> usize {
        match self {
            EffectsPayload::List(effects) => effects.len(),
            EffectsPayload::Nested(list) => list.list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The event record that caused a script invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl Trigger {
    pub fn new(trigger_type: impl Into<String>) -> Self {
        Self {
            trigger_type: trigger_type.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
