//! Error taxonomy for the script contract.
//!
//! Definition-time errors ([`ScriptError::SchemaMismatch`],
//! [`ScriptError::ManifestIncompatible`]) are fatal to registering one
//! script and nothing else. Invocation-time errors ([`ScriptError::RunFailure`],
//! [`ScriptError::RunRejected`]) are local to one invocation.

use thiserror::Error;

use crate::parameter::ParameterKind;
use crate::value::ValueKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// A parameter schema does not fit the script's declared bag type, or a
    /// descriptor violates its own construction rules.
    #[error("parameter `{field}`: {detail}")]
    SchemaMismatch {
        field: String,
        detail: SchemaMismatch,
    },

    /// The manifest's compatibility tag does not match this host.
    #[error("script targets host version {declared:?}, this host accepts major version {accepted}")]
    ManifestIncompatible {
        declared: Option<String>,
        accepted: String,
    },

    /// The capability registry is missing one of the fixed entries.
    #[error("capability registry is missing fixed entry `{name}`")]
    MissingCapability { name: String },

    /// A run request's parameter bag does not cover a schema field.
    #[error("run request is missing parameter `{field}`")]
    MissingParameter { field: String },

    /// The script reported failure through its run result.
    #[error("script reported failure: {message}")]
    RunFailure { message: String },

    /// The script's run escaped the contract (threw, timed out, or never
    /// produced a result).
    #[error("script run was rejected: {message}")]
    RunRejected { message: String },
}

impl ScriptError {
    pub(crate) fn mismatch(field: &str, detail: SchemaMismatch) -> Self {
        ScriptError::SchemaMismatch {
            field: field.to_owned(),
            detail,
        }
    }
}

/// Why a schema was rejected for one field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaMismatch {
    #[error("descriptor kind `{kind}` is not legal for `{value}` values")]
    IllegalKind { value: ValueKind, kind: ParameterKind },

    #[error("enum default is not a member of `options`")]
    DefaultNotInOptions,

    #[error("supplied `{value}` value does not fit descriptor kind `{kind}`")]
    ValueTypeMismatch { kind: ParameterKind, value: ValueKind },

    #[error("supplied value is not a member of `options`")]
    ValueNotInOptions,

    #[error("declared parameter has no descriptor")]
    MissingDescriptor,

    #[error("descriptor does not correspond to any declared parameter")]
    UndeclaredField,

    #[error("field name is declared more than once")]
    DuplicateField,
}
