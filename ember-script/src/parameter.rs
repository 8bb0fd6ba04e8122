//! The parameter descriptor model.
//!
//! A descriptor tells the host how one configurable script parameter is
//! edited, validated, and defaulted. The set of kinds is closed so both the
//! schema validator here and the host's UI renderer can match exhaustively;
//! adding a kind is a compile-time-visible change at every consumption site.
//!
//! Wire shape matches existing script packages: internally tagged on
//! `"type"`, camelCase field names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::EffectList;
use crate::error::{SchemaMismatch, ScriptError};
use crate::value::ParameterValue;

/// Discriminant of the descriptor union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Password,
    Boolean,
    Number,
    Enum,
    Filepath,
    EffectList,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::String => "string",
            ParameterKind::Password => "password",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Number => "number",
            ParameterKind::Enum => "enum",
            ParameterKind::Filepath => "filepath",
            ParameterKind::EffectList => "effectlist",
        };
        write!(f, "{name}")
    }
}

/// Metadata shared by every descriptor kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseParameter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_description: Option<String>,
    /// UI hint: draw a divider below this parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_bottom_hr: Option<bool>,
}

/// Free-text parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringParameter {
    #[serde(flatten)]
    pub base: BaseParameter,
    /// UI hint: edit as a multi-line text area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_text_area: Option<bool>,
    pub default: String,
}

impl StringParameter {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            base: BaseParameter::default(),
            use_text_area: None,
            default: default.into(),
        }
    }
}

/// Like [`StringParameter`], but the host must mask the displayed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordParameter {
    #[serde(flatten)]
    pub base: BaseParameter,
    pub default: String,
}

impl PasswordParameter {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            base: BaseParameter::default(),
            default: default.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanParameter {
    #[serde(flatten)]
    pub base: BaseParameter,
    pub default: bool,
}

impl BooleanParameter {
    pub fn new(default: bool) -> Self {
        Self {
            base: BaseParameter::default(),
            default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberParameter {
    #[serde(flatten)]
    pub base: BaseParameter,
    pub default: f64,
}

impl NumberParameter {
    pub fn new(default: f64) -> Self {
        Self {
            base: BaseParameter::default(),
            default,
        }
    }
}

/// One element of an enum descriptor's `options` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumOption {
    Text(String),
    Number(f64),
}

impl fmt::Display for EnumOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumOption::Text(s) => write!(f, "{s}"),
            EnumOption::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for EnumOption {
    fn from(value: &str) -> Self {
        EnumOption::Text(value.to_owned())
    }
}

impl From<String> for EnumOption {
    fn from(value: String) -> Self {
        EnumOption::Text(value)
    }
}

impl From<f64> for EnumOption {
    fn from(value: f64) -> Self {
        EnumOption::Number(value)
    }
}

impl From<i32> for EnumOption {
    fn from(value: i32) -> Self {
        EnumOption::Number(value.into())
    }
}

/// Closed-options parameter. `default` must be a member of `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumParameter {
    #[serde(flatten)]
    pub base: BaseParameter,
    pub options: Vec<EnumOption>,
    pub default: EnumOption,
}

impl EnumParameter {
    pub fn new(
        options: impl IntoIterator<Item = EnumOption>,
        default: impl Into<EnumOption>,
    ) -> Self {
        Self {
            base: BaseParameter::default(),
            options: options.into_iter().collect(),
            default: default.into(),
        }
    }
}

/// File-dialog configuration for a [`FilepathParameter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOptions {
    #[serde(default)]
    pub directory_only: bool,
    #[serde(default)]
    pub filters: Vec<FileFilter>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub button_label: String,
}

/// One extension filter in a file dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

/// File-selection parameter. Carries no default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilepathParameter {
    #[serde(flatten)]
    pub base: BaseParameter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_options: Option<FileOptions>,
}

/// Nested, orderable list of host effects. Carries no default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectListParameter {
    #[serde(flatten)]
    pub base: BaseParameter,
}

/// A validated description of one configurable parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterDescriptor {
    String(StringParameter),
    Password(PasswordParameter),
    Boolean(BooleanParameter),
    Number(NumberParameter),
    Enum(EnumParameter),
    Filepath(FilepathParameter),
    EffectList(EffectListParameter),
}

impl ParameterDescriptor {
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterDescriptor::String(_) => ParameterKind::String,
            ParameterDescriptor::Password(_) => ParameterKind::Password,
            ParameterDescriptor::Boolean(_) => ParameterKind::Boolean,
            ParameterDescriptor::Number(_) => ParameterKind::Number,
            ParameterDescriptor::Enum(_) => ParameterKind::Enum,
            ParameterDescriptor::Filepath(_) => ParameterKind::Filepath,
            ParameterDescriptor::EffectList(_) => ParameterKind::EffectList,
        }
    }

    pub fn base(&self) -> &BaseParameter {
        match self {
            ParameterDescriptor::String(p) => &p.base,
            ParameterDescriptor::Password(p) => &p.base,
            ParameterDescriptor::Boolean(p) => &p.base,
            ParameterDescriptor::Number(p) => &p.base,
            ParameterDescriptor::Enum(p) => &p.base,
            ParameterDescriptor::Filepath(p) => &p.base,
            ParameterDescriptor::EffectList(p) => &p.base,
        }
    }

    /// Check this descriptor's own construction rules.
    ///
    /// Primitive default/type agreement is carried by the typed fields; the
    /// remaining runtime rule is enum default membership.
    pub fn validate(&self, field: &str) -> Result<(), ScriptError> {
        match self {
            ParameterDescriptor::Enum(p) => {
                if !p.options.contains(&p.default) {
                    return Err(ScriptError::mismatch(
                        field,
                        SchemaMismatch::DefaultNotInOptions,
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The value a field resolves to when the user supplies no override.
    ///
    /// `filepath` resolves to the empty string and `effectlist` to an empty
    /// list, so a resolved bag always covers every schema field.
    pub fn default_value(&self) -> ParameterValue {
        match self {
            ParameterDescriptor::String(p) => ParameterValue::String(p.default.clone()),
            ParameterDescriptor::Password(p) => ParameterValue::String(p.default.clone()),
            ParameterDescriptor::Boolean(p) => ParameterValue::Bool(p.default),
            ParameterDescriptor::Number(p) => ParameterValue::Number(p.default),
            ParameterDescriptor::Enum(p) => match &p.default {
                EnumOption::Text(s) => ParameterValue::String(s.clone()),
                EnumOption::Number(n) => ParameterValue::Number(*n),
            },
            ParameterDescriptor::Filepath(_) => ParameterValue::String(String::new()),
            ParameterDescriptor::EffectList(_) => ParameterValue::EffectList(EffectList::default()),
        }
    }
}
