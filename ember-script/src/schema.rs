//! The parameter schema: field name → descriptor.
//!
//! A schema is built once at script registration and is immutable
//! afterwards. Field names are unique; insertion order is preserved for UI
//! listing but carries no meaning.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{SchemaMismatch, ScriptError};
use crate::parameter::{EnumOption, ParameterDescriptor};
use crate::resolver;
use crate::value::{BagType, ParameterBag, ParameterValue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema {
    fields: IndexMap<String, ParameterDescriptor>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor for a field. Duplicate field names are rejected.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        descriptor: ParameterDescriptor,
    ) -> Result<(), ScriptError> {
        let field = field.into();
        if self.fields.contains_key(&field) {
            return Err(ScriptError::mismatch(&field, SchemaMismatch::DuplicateField));
        }
        self.fields.insert(field, descriptor);
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&ParameterDescriptor> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterDescriptor)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every descriptor's own construction rules.
    pub fn validate(&self) -> Result<(), ScriptError> {
        for (field, descriptor) in &self.fields {
            descriptor.validate(field)?;
        }
        Ok(())
    }

    /// Check this schema against a script's declared bag type.
    ///
    /// The field sets must match exactly: every declared field needs a
    /// descriptor of a legal kind, and every descriptor must correspond to a
    /// declared field.
    pub fn check_against(&self, bag_type: &BagType) -> Result<(), ScriptError> {
        for (field, &value_kind) in bag_type {
            match self.fields.get(field) {
                Some(descriptor) => resolver::check_field(field, value_kind, descriptor)?,
                None => {
                    return Err(ScriptError::mismatch(field, SchemaMismatch::MissingDescriptor))
                }
            }
        }
        for field in self.fields.keys() {
            if !bag_type.contains_key(field) {
                return Err(ScriptError::mismatch(field, SchemaMismatch::UndeclaredField));
            }
        }
        Ok(())
    }

    /// Merge user-supplied overrides with descriptor defaults into a
    /// concrete bag covering every schema field.
    ///
    /// Overrides are type-checked against their descriptor; override fields
    /// not present in the schema are silently ignored.
    pub fn resolve(&self, overrides: &ParameterBag) -> Result<ParameterBag, ScriptError> {
        let mut bag = ParameterBag::with_capacity(self.fields.len());
        for (field, descriptor) in &self.fields {
            let value = match overrides.get(field) {
                Some(value) => {
                    check_value(field, descriptor, value)?;
                    value.clone()
                }
                None => descriptor.default_value(),
            };
            bag.insert(field.clone(), value);
        }
        Ok(bag)
    }
}

impl FromIterator<(String, ParameterDescriptor)> for ParameterSchema {
    fn from_iter<I: IntoIterator<Item = (String, ParameterDescriptor)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Check a concrete override value against its descriptor.
fn check_value(
    field: &str,
    descriptor: &ParameterDescriptor,
    value: &ParameterValue,
) -> Result<(), ScriptError> {
    let mismatch = || {
        ScriptError::mismatch(
            field,
            SchemaMismatch::ValueTypeMismatch {
                kind: descriptor.kind(),
                value: value.kind(),
            },
        )
    };

    match descriptor {
        ParameterDescriptor::String(_)
        | ParameterDescriptor::Password(_)
        | ParameterDescriptor::Filepath(_) => match value {
            ParameterValue::String(_) => Ok(()),
            _ => Err(mismatch()),
        },
        ParameterDescriptor::Boolean(_) => match value {
            ParameterValue::Bool(_) => Ok(()),
            _ => Err(mismatch()),
        },
        ParameterDescriptor::Number(_) => match value {
            ParameterValue::Number(_) => Ok(()),
            _ => Err(mismatch()),
        },
        ParameterDescriptor::Enum(p) => {
            let option = match value {
                ParameterValue::String(s) => EnumOption::Text(s.clone()),
                ParameterValue::Number(n) => EnumOption::Number(*n),
                _ => return Err(mismatch()),
            };
            if p.options.contains(&option) {
                Ok(())
            } else {
                Err(ScriptError::mismatch(field, SchemaMismatch::ValueNotInOptions))
            }
        }
        ParameterDescriptor::EffectList(_) => match value {
            ParameterValue::EffectList(_) => Ok(()),
            _ => Err(mismatch()),
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parameter::{
        BooleanParameter, EnumParameter, NumberParameter, ParameterKind, StringParameter,
    };
    use crate::value::ValueKind;

    fn retries_enabled_mode_schema() -> ParameterSchema {
        let mut schema = ParameterSchema::new();
        schema
            .insert(
                "retries",
                ParameterDescriptor::Number(NumberParameter::new(3.0)),
            )
            .unwrap();
        schema
            .insert(
                "enabled",
                ParameterDescriptor::Boolean(BooleanParameter::new(true)),
            )
            .unwrap();
        schema
            .insert(
                "mode",
                ParameterDescriptor::Enum(EnumParameter::new(
                    [EnumOption::from("fast"), EnumOption::from("safe")],
                    "fast",
                )),
            )
            .unwrap();
        schema
    }

    fn retries_enabled_mode_bag_type() -> BagType {
        BagType::from_iter([
            ("retries".to_owned(), ValueKind::Number),
            ("enabled".to_owned(), ValueKind::Bool),
            ("mode".to_owned(), ValueKind::List),
        ])
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let mut schema = ParameterSchema::new();
        schema
            .insert("a", ParameterDescriptor::Boolean(BooleanParameter::new(true)))
            .unwrap();
        let err = schema
            .insert("a", ParameterDescriptor::Boolean(BooleanParameter::new(false)))
            .unwrap_err();
        assert!(matches!(
            err,
            ScriptError::SchemaMismatch {
                detail: SchemaMismatch::DuplicateField,
                ..
            }
        ));
    }

    #[test]
    fn exact_assignment_passes_the_resolver() {
        let schema = retries_enabled_mode_schema();
        schema.validate().unwrap();
        schema.check_against(&retries_enabled_mode_bag_type()).unwrap();
    }

    #[test]
    fn wrong_kind_for_declared_field_fails() {
        let mut schema = retries_enabled_mode_schema();
        // Swap the boolean descriptor for a string one.
        schema.fields.insert(
            "enabled".to_owned(),
            ParameterDescriptor::String(StringParameter::new("yes")),
        );
        let err = schema
            .check_against(&retries_enabled_mode_bag_type())
            .unwrap_err();
        assert_eq!(
            err,
            ScriptError::SchemaMismatch {
                field: "enabled".to_owned(),
                detail: SchemaMismatch::IllegalKind {
                    value: ValueKind::Bool,
                    kind: ParameterKind::String,
                },
            }
        );
    }

    #[test]
    fn declared_field_without_descriptor_fails() {
        let mut schema = retries_enabled_mode_schema();
        schema.fields.shift_remove("mode");
        let err = schema
            .check_against(&retries_enabled_mode_bag_type())
            .unwrap_err();
        assert!(matches!(
            err,
            ScriptError::SchemaMismatch {
                ref field,
                detail: SchemaMismatch::MissingDescriptor,
            } if field == "mode"
        ));
    }

    #[test]
    fn descriptor_for_undeclared_field_fails() {
        let mut schema = retries_enabled_mode_schema();
        schema
            .insert(
                "extra",
                ParameterDescriptor::String(StringParameter::new("")),
            )
            .unwrap();
        let err = schema
            .check_against(&retries_enabled_mode_bag_type())
            .unwrap_err();
        assert!(matches!(
            err,
            ScriptError::SchemaMismatch {
                ref field,
                detail: SchemaMismatch::UndeclaredField,
            } if field == "extra"
        ));
    }

    #[test]
    fn resolve_fills_defaults_and_applies_overrides() {
        let schema = retries_enabled_mode_schema();
        let overrides = ParameterBag::from_iter([
            ("retries".to_owned(), ParameterValue::Number(7.0)),
            // Not in the schema: must be ignored.
            ("ghost".to_owned(), ParameterValue::Bool(true)),
        ]);

        let bag = schema.resolve(&overrides).unwrap();
        assert_eq!(bag.len(), 3);
        assert_eq!(bag["retries"], ParameterValue::Number(7.0));
        assert_eq!(bag["enabled"], ParameterValue::Bool(true));
        assert_eq!(bag["mode"], ParameterValue::String("fast".to_owned()));
        assert!(!bag.contains_key("ghost"));
    }

    #[test]
    fn resolve_rejects_mistyped_override() {
        let schema = retries_enabled_mode_schema();
        let overrides = ParameterBag::from_iter([(
            "enabled".to_owned(),
            ParameterValue::String("yes".to_owned()),
        )]);
        let err = schema.resolve(&overrides).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::SchemaMismatch {
                detail: SchemaMismatch::ValueTypeMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn resolve_rejects_enum_override_outside_options() {
        let schema = retries_enabled_mode_schema();
        let overrides = ParameterBag::from_iter([(
            "mode".to_owned(),
            ParameterValue::String("reckless".to_owned()),
        )]);
        let err = schema.resolve(&overrides).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::SchemaMismatch {
                detail: SchemaMismatch::ValueNotInOptions,
                ..
            }
        ));
    }

    #[test]
    fn schema_round_trips_through_json() {
        let schema = retries_enabled_mode_schema();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["retries"]["type"], "number");
        let back: ParameterSchema = serde_json::from_value(json).unwrap();
        assert_eq!(back, schema);
    }
}
