//! Conversions between Lua values and the contract types.
//!
//! Scripts hand us manifests, schemas, and run results as plain Lua tables;
//! the host hands scripts a run request table. Everything crossing that
//! boundary goes through this module.
//!
//! Absent optional fields read as `None`; a present field of the wrong type
//! and a missing required field both produce an error naming the field and
//! what was found, so a script author sees the actual problem instead of a
//! generic type error.

use ember_script::{
    BagType, BaseParameter, BooleanParameter, Effect, EffectList, EffectListParameter,
    EffectsPayload, EnumOption, EnumParameter, FileFilter, FileOptions, FilepathParameter,
    HostContext, NumberParameter, ParameterDescriptor, ParameterSchema, ParameterValue,
    PasswordParameter, RunRequest, RunResult, ScriptManifest, StringParameter, UserAccount,
};
use log::warn;
use mlua::prelude::*;
use serde_json::Value;

/// Extract an optional string field from a Lua table. Nil reads as `None`;
/// any other non-string value is an error naming the field.
pub fn extract_string_opt(table: &LuaTable, field: &str) -> LuaResult<Option<String>> {
    match table.get::<LuaValue>(field)? {
        LuaValue::Nil => Ok(None),
        LuaValue::String(s) => Ok(Some(s.to_string_lossy().to_string())),
        other => Err(LuaError::external(format!(
            "field `{field}` must be a string, found {}",
            other.type_name()
        ))),
    }
}

/// Extract an optional boolean field from a Lua table.
pub fn extract_bool_opt(table: &LuaTable, field: &str) -> LuaResult<Option<bool>> {
    match table.get::<LuaValue>(field)? {
        LuaValue::Nil => Ok(None),
        LuaValue::Boolean(b) => Ok(Some(b)),
        other => Err(LuaError::external(format!(
            "field `{field}` must be a boolean, found {}",
            other.type_name()
        ))),
    }
}

/// Extract an optional numeric field from a Lua table.
pub fn extract_number_opt(table: &LuaTable, field: &str) -> LuaResult<Option<f64>> {
    match table.get::<LuaValue>(field)? {
        LuaValue::Nil => Ok(None),
        LuaValue::Integer(i) => Ok(Some(i as f64)),
        LuaValue::Number(n) => Ok(Some(n)),
        other => Err(LuaError::external(format!(
            "field `{field}` must be a number, found {}",
            other.type_name()
        ))),
    }
}

fn require_string(table: &LuaTable, field: &str) -> LuaResult<String> {
    extract_string_opt(table, field)?
        .ok_or_else(|| LuaError::external(format!("missing required string field `{field}`")))
}

fn require_table(table: &LuaTable, field: &str) -> LuaResult<LuaTable> {
    match table.get::<LuaValue>(field)? {
        LuaValue::Table(t) => Ok(t),
        _ => Err(LuaError::external(format!(
            "missing required table field `{field}`"
        ))),
    }
}

/// Extract a script manifest from the table `getScriptManifest` returned.
pub fn manifest_from_lua(table: &LuaTable) -> LuaResult<ScriptManifest> {
    let mut manifest = ScriptManifest::new(
        require_string(table, "name")?,
        require_string(table, "description")?,
        require_string(table, "version")?,
        require_string(table, "author")?,
    );
    manifest.website = extract_string_opt(table, "website")?;
    manifest.startup_only = extract_bool_opt(table, "startupOnly")?;
    manifest.firebot_version = extract_string_opt(table, "firebotVersion")?;
    Ok(manifest)
}

fn base_from_lua(table: &LuaTable) -> LuaResult<BaseParameter> {
    Ok(BaseParameter {
        description: extract_string_opt(table, "description")?,
        secondary_description: extract_string_opt(table, "secondaryDescription")?,
        show_bottom_hr: extract_bool_opt(table, "showBottomHr")?,
    })
}

fn enum_option_from_lua(value: &LuaValue) -> LuaResult<EnumOption> {
    match value {
        LuaValue::String(s) => Ok(EnumOption::Text(s.to_string_lossy().to_string())),
        LuaValue::Integer(i) => Ok(EnumOption::Number(*i as f64)),
        LuaValue::Number(n) => Ok(EnumOption::Number(*n)),
        other => Err(LuaError::external(format!(
            "enum options must be strings or numbers, found {}",
            other.type_name()
        ))),
    }
}

fn file_options_from_lua(table: &LuaTable) -> LuaResult<FileOptions> {
    let mut filters = Vec::new();
    if let Ok(LuaValue::Table(list)) = table.get::<LuaValue>("filters") {
        for entry in list.sequence_values::<LuaTable>() {
            let entry = entry?;
            let mut extensions = Vec::new();
            if let Ok(LuaValue::Table(exts)) = entry.get::<LuaValue>("extensions") {
                for ext in exts.sequence_values::<String>() {
                    extensions.push(ext?);
                }
            }
            filters.push(FileFilter {
                name: require_string(&entry, "name")?,
                extensions,
            });
        }
    }
    Ok(FileOptions {
        directory_only: extract_bool_opt(table, "directoryOnly")?.unwrap_or(false),
        filters,
        title: extract_string_opt(table, "title")?.unwrap_or_default(),
        button_label: extract_string_opt(table, "buttonLabel")?.unwrap_or_default(),
    })
}

/// Extract one parameter descriptor, keyed on its `type` tag.
pub fn descriptor_from_lua(field: &str, table: &LuaTable) -> LuaResult<ParameterDescriptor> {
    let base = base_from_lua(table)?;
    let kind = match table.get::<LuaValue>("type")? {
        LuaValue::Nil => {
            return Err(LuaError::external(format!(
                "parameter `{field}` has no `type` tag"
            )))
        }
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        other => {
            return Err(LuaError::external(format!(
                "parameter `{field}`: `type` must be a string, found {}",
                other.type_name()
            )))
        }
    };

    let missing_default =
        || LuaError::external(format!("parameter `{field}` ({kind}) requires a default"));

    match kind.as_str() {
        "string" => Ok(ParameterDescriptor::String(StringParameter {
            base,
            use_text_area: extract_bool_opt(table, "useTextArea")?,
            default: extract_string_opt(table, "default")?.ok_or_else(missing_default)?,
        })),
        "password" => Ok(ParameterDescriptor::Password(PasswordParameter {
            base,
            default: extract_string_opt(table, "default")?.ok_or_else(missing_default)?,
        })),
        "boolean" => Ok(ParameterDescriptor::Boolean(BooleanParameter {
            base,
            default: extract_bool_opt(table, "default")?.ok_or_else(missing_default)?,
        })),
        "number" => Ok(ParameterDescriptor::Number(NumberParameter {
            base,
            default: extract_number_opt(table, "default")?.ok_or_else(missing_default)?,
        })),
        "enum" => {
            let options_table = require_table(table, "options").map_err(|_| {
                LuaError::external(format!("parameter `{field}` (enum) requires `options`"))
            })?;
            let mut options = Vec::new();
            for value in options_table.sequence_values::<LuaValue>() {
                options.push(enum_option_from_lua(&value?)?);
            }
            let default = match table.get::<LuaValue>("default")? {
                LuaValue::Nil => return Err(missing_default()),
                value => enum_option_from_lua(&value)?,
            };
            Ok(ParameterDescriptor::Enum(EnumParameter {
                base,
                options,
                default,
            }))
        }
        "filepath" => {
            let file_options = match table.get::<LuaValue>("fileOptions")? {
                LuaValue::Table(t) => Some(file_options_from_lua(&t)?),
                _ => None,
            };
            Ok(ParameterDescriptor::Filepath(FilepathParameter {
                base,
                file_options,
            }))
        }
        "effectlist" => Ok(ParameterDescriptor::EffectList(EffectListParameter { base })),
        other => Err(LuaError::external(format!(
            "parameter `{field}` has unknown type `{other}`"
        ))),
    }
}

/// Extract the full parameter schema from the table
/// `getDefaultParameters` returned.
pub fn schema_from_lua(table: &LuaTable) -> LuaResult<ParameterSchema> {
    let mut schema = ParameterSchema::new();
    for pair in table.pairs::<String, LuaTable>() {
        let (field, descriptor_table) = pair?;
        let descriptor = descriptor_from_lua(&field, &descriptor_table)?;
        schema.insert(field, descriptor).map_err(LuaError::external)?;
    }
    Ok(schema)
}

/// Extract a declared bag type from a script's optional `parameterTypes`
/// table (field name → kind name).
pub fn bag_type_from_lua(table: &LuaTable) -> LuaResult<BagType> {
    let mut bag_type = BagType::new();
    for pair in table.pairs::<String, String>() {
        let (field, kind_name) = pair?;
        let kind = kind_name.parse().map_err(|err: String| {
            LuaError::external(format!("parameterTypes.{field}: {err}"))
        })?;
        bag_type.insert(field, kind);
    }
    Ok(bag_type)
}

/// Convert an arbitrary Lua value to JSON, for values outside the closed
/// parameter set. Functions and userdata are not representable.
pub fn json_from_lua(value: &LuaValue) -> LuaResult<Value> {
    match value {
        LuaValue::Nil => Ok(Value::Null),
        LuaValue::Boolean(b) => Ok(Value::Bool(*b)),
        LuaValue::Integer(i) => Ok(Value::from(*i)),
        LuaValue::Number(n) => Ok(serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        LuaValue::String(s) => Ok(Value::String(s.to_string_lossy().to_string())),
        LuaValue::Table(t) => {
            if t.raw_len() > 0 {
                let mut items = Vec::with_capacity(t.raw_len());
                for item in t.sequence_values::<LuaValue>() {
                    items.push(json_from_lua(&item?)?);
                }
                Ok(Value::Array(items))
            } else {
                let mut map = serde_json::Map::new();
                for pair in t.pairs::<LuaValue, LuaValue>() {
                    let (key, value) = pair?;
                    if let LuaValue::String(key) = key {
                        map.insert(key.to_string_lossy().to_string(), json_from_lua(&value)?);
                    }
                }
                Ok(Value::Object(map))
            }
        }
        other => Err(LuaError::external(format!(
            "cannot represent {} as a parameter value",
            other.type_name()
        ))),
    }
}

/// Convert JSON back into a Lua value.
pub fn json_to_lua(lua: &Lua, value: &Value) -> LuaResult<LuaValue> {
    match value {
        Value::Null => Ok(LuaValue::Nil),
        Value::Bool(b) => Ok(LuaValue::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(LuaValue::Integer(i))
            } else {
                Ok(LuaValue::Number(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => Ok(LuaValue::String(lua.create_string(s)?)),
        Value::Array(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (i, item) in items.iter().enumerate() {
                table.set(i + 1, json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
        Value::Object(map) => {
            let table = lua.create_table_with_capacity(0, map.len())?;
            for (key, item) in map {
                table.set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
    }
}

/// Convert a Lua value to a [`ParameterValue`].
///
/// A table with a `list` field is an effect list; a table with sequence
/// entries is a list; anything else falls back to the JSON escape hatch.
pub fn value_from_lua(value: &LuaValue) -> LuaResult<ParameterValue> {
    match value {
        LuaValue::Boolean(b) => Ok(ParameterValue::Bool(*b)),
        LuaValue::Integer(i) => Ok(ParameterValue::Number(*i as f64)),
        LuaValue::Number(n) => Ok(ParameterValue::Number(*n)),
        LuaValue::String(s) => Ok(ParameterValue::String(s.to_string_lossy().to_string())),
        LuaValue::Table(t) => {
            if t.contains_key("list")? {
                Ok(ParameterValue::EffectList(effect_list_from_lua(t)?))
            } else if t.raw_len() > 0 {
                let mut items = Vec::with_capacity(t.raw_len());
                for item in t.sequence_values::<LuaValue>() {
                    items.push(value_from_lua(&item?)?);
                }
                Ok(ParameterValue::List(items))
            } else {
                Ok(ParameterValue::Other(json_from_lua(value)?))
            }
        }
        other => Err(LuaError::external(format!(
            "cannot represent {} as a parameter value",
            other.type_name()
        ))),
    }
}

/// Convert a [`ParameterValue`] into the Lua value the script reads.
pub fn value_to_lua(lua: &Lua, value: &ParameterValue) -> LuaResult<LuaValue> {
    match value {
        ParameterValue::Bool(b) => Ok(LuaValue::Boolean(*b)),
        ParameterValue::Number(n) => Ok(LuaValue::Number(*n)),
        ParameterValue::String(s) => Ok(LuaValue::String(lua.create_string(s)?)),
        ParameterValue::List(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (i, item) in items.iter().enumerate() {
                table.set(i + 1, value_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
        ParameterValue::EffectList(list) => Ok(LuaValue::Table(effect_list_to_lua(lua, list)?)),
        ParameterValue::Other(json) => json_to_lua(lua, json),
    }
}

fn effect_from_lua(table: &LuaTable) -> LuaResult<Effect> {
    let effect_type = match table.get::<LuaValue>("type")? {
        LuaValue::Nil => return Err(LuaError::external("effect is missing its `type` tag")),
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        other => {
            return Err(LuaError::external(format!(
                "effect `type` must be a string, found {}",
                other.type_name()
            )))
        }
    };
    let mut effect = Effect::new(effect_type);
    for pair in table.pairs::<LuaValue, LuaValue>() {
        let (key, value) = pair?;
        if let LuaValue::String(key) = key {
            let key = key.to_string_lossy().to_string();
            if key != "type" {
                effect.data.insert(key, json_from_lua(&value)?);
            }
        }
    }
    Ok(effect)
}

fn effect_to_lua(lua: &Lua, effect: &Effect) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    table.set("type", effect.effect_type.as_str())?;
    for (key, value) in &effect.data {
        table.set(key.as_str(), json_to_lua(lua, value)?)?;
    }
    Ok(table)
}

fn effect_list_from_lua(table: &LuaTable) -> LuaResult<EffectList> {
    let mut list = Vec::new();
    if let Ok(LuaValue::Table(entries)) = table.get::<LuaValue>("list") {
        for entry in entries.sequence_values::<LuaTable>() {
            list.push(effect_from_lua(&entry?)?);
        }
    }
    Ok(EffectList {
        id: extract_string_opt(table, "id")?,
        list,
    })
}

fn effect_list_to_lua(lua: &Lua, list: &EffectList) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    if let Some(id) = &list.id {
        table.set("id", id.as_str())?;
    }
    let entries = lua.create_table_with_capacity(list.list.len(), 0)?;
    for (i, effect) in list.list.iter().enumerate() {
        entries.set(i + 1, effect_to_lua(lua, effect)?)?;
    }
    table.set("list", entries)?;
    Ok(table)
}

/// Extract the effects a run result carries: nil, a flat sequence, or a
/// nested effect list.
pub fn effects_from_lua(value: &LuaValue) -> LuaResult<EffectsPayload> {
    match value {
        LuaValue::Nil => Ok(EffectsPayload::default()),
        LuaValue::Table(t) => {
            if t.contains_key("list")? {
                Ok(EffectsPayload::Nested(effect_list_from_lua(t)?))
            } else {
                let mut effects = Vec::with_capacity(t.raw_len());
                for entry in t.sequence_values::<LuaTable>() {
                    effects.push(effect_from_lua(&entry?)?);
                }
                Ok(EffectsPayload::List(effects))
            }
        }
        other => Err(LuaError::external(format!(
            "effects must be a table, found {}",
            other.type_name()
        ))),
    }
}

/// Map the value `run` returned onto a [`RunResult`].
///
/// `nil` is the sanctioned fire-and-forget shorthand. A table must carry an
/// explicit `success` boolean; anything else violates the contract.
pub fn run_result_from_lua(value: LuaValue) -> LuaResult<RunResult> {
    let table = match value {
        LuaValue::Nil => return Ok(RunResult::success()),
        LuaValue::Table(t) => t,
        other => {
            return Err(LuaError::external(format!(
                "run must return nil or a result table, found {}",
                other.type_name()
            )))
        }
    };

    let success = extract_bool_opt(&table, "success")?
        .ok_or_else(|| LuaError::external("run result is missing the `success` flag"))?;
    let effects = effects_from_lua(&table.get::<LuaValue>("effects")?)?;
    let callback = match table.get::<LuaValue>("callback")? {
        LuaValue::Function(f) => {
            let hook: Box<dyn FnOnce()> = Box::new(move || {
                if let Err(err) = f.call::<()>(()) {
                    warn!("script completion callback failed: {err}");
                }
            });
            Some(hook)
        }
        _ => None,
    };

    Ok(RunResult {
        success,
        error_message: extract_string_opt(&table, "errorMessage")?,
        effects,
        callback,
    })
}

fn account_to_lua(lua: &Lua, account: &UserAccount) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    table.set("username", account.username.as_str())?;
    table.set("displayName", account.display_name.as_str())?;
    table.set("userId", account.user_id.as_str())?;
    table.set("avatar", account.avatar.as_str())?;
    table.set("loggedIn", account.logged_in)?;

    let auth = lua.create_table()?;
    auth.set("access_token", account.auth.access_token.as_str())?;
    auth.set("expires_at", account.auth.expires_at.as_str())?;
    auth.set("refresh_token", account.auth.refresh_token.as_str())?;
    table.set("auth", auth)?;
    Ok(table)
}

fn host_context_to_lua(lua: &Lua, context: &HostContext) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;

    let accounts = lua.create_table()?;
    accounts.set("streamer", account_to_lua(lua, &context.accounts.streamer)?)?;
    accounts.set("bot", account_to_lua(lua, &context.accounts.bot)?)?;
    table.set("accounts", accounts)?;

    let settings = lua.create_table()?;
    settings.set("webServerPort", context.settings.web_server_port)?;
    table.set("settings", settings)?;

    table.set("version", context.version.as_str())?;
    Ok(table)
}

/// Build the run request table passed to a script's `run`. Built fresh per
/// invocation; only the modules table is shared state.
pub fn request_to_lua(
    lua: &Lua,
    request: &RunRequest,
    modules: LuaTable,
) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;

    let parameters = lua.create_table_with_capacity(0, request.parameters.len())?;
    for (field, value) in &request.parameters {
        parameters.set(field.as_str(), value_to_lua(lua, value)?)?;
    }
    table.set("parameters", parameters)?;
    table.set("modules", modules)?;
    table.set("firebot", host_context_to_lua(lua, &request.firebot)?)?;

    let trigger = lua.create_table()?;
    trigger.set("type", request.trigger.trigger_type.as_str())?;
    trigger.set("metadata", json_to_lua(lua, &request.trigger.metadata)?)?;
    table.set("trigger", trigger)?;

    Ok(table)
}
