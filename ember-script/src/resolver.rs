//! The parameter-type resolver.
//!
//! Given the value kind a script declares for a field, exactly these
//! descriptor kinds are legal:
//!
//! - `string` → `string`, `password`, `filepath` (all textually represented,
//!   but they need different UI affordances, so the author picks explicitly)
//! - `number` → `number`
//! - `boolean` → `boolean`
//! - `list` → `enum`
//! - `effectlist` → `effectlist`
//! - anything else → the full open union (the host still applies the chosen
//!   descriptor's own rules)
//!
//! The check runs at schema-definition time, never during `run`. It exists
//! to reject a schema like "boolean field with a string default" before a
//! user ever opens the parameter editor.

use crate::error::{SchemaMismatch, ScriptError};
use crate::parameter::{ParameterDescriptor, ParameterKind};
use crate::value::ValueKind;

/// Every descriptor kind, for the permissive fallback.
pub const ALL_KINDS: &[ParameterKind] = &[
    ParameterKind::String,
    ParameterKind::Password,
    ParameterKind::Boolean,
    ParameterKind::Number,
    ParameterKind::Enum,
    ParameterKind::Filepath,
    ParameterKind::EffectList,
];

/// The descriptor kinds legal for a declared value kind.
pub fn legal_kinds(value: ValueKind) -> &'static [ParameterKind] {
    match value {
        ValueKind::String => &[
            ParameterKind::String,
            ParameterKind::Password,
            ParameterKind::Filepath,
        ],
        ValueKind::Number => &[ParameterKind::Number],
        ValueKind::Bool => &[ParameterKind::Boolean],
        ValueKind::List => &[ParameterKind::Enum],
        ValueKind::EffectList => &[ParameterKind::EffectList],
        ValueKind::Other => ALL_KINDS,
    }
}

/// Check one field's descriptor against its declared value kind.
pub fn check_field(
    field: &str,
    value: ValueKind,
    descriptor: &ParameterDescriptor,
) -> Result<(), ScriptError> {
    let kind = descriptor.kind();
    if legal_kinds(value).contains(&kind) {
        Ok(())
    } else {
        Err(ScriptError::mismatch(
            field,
            SchemaMismatch::IllegalKind { value, kind },
        ))
    }
}
