//! Bridging host capabilities into the Lua environment.
//!
//! The contract-side registry holds opaque handles; scripts need callable
//! tables. A [`LuaCapability`] renders one registry entry as a Lua value.
//! Entries without a bridge still appear in `modules` as inert stub tables
//! carrying their name, so `modules[name]` lookups stay total.
//!
//! Built-in bridges cover the entries this layer owns: `logger`, `fs`, and
//! `path`. Everything else (command manager, currency manager, …) is bridged
//! by the embedding host.

use std::path::Path;

use ember_script::{well_known, CapabilityRegistry};
use log::{debug, error, info, warn};
use mlua::prelude::*;

/// Renders one named capability as the Lua value scripts see.
pub trait LuaCapability {
    /// Registry entry this bridge backs.
    fn name(&self) -> &str;

    /// Build the Lua-side value. Called once per modules table.
    fn register(&self, lua: &Lua) -> LuaResult<LuaValue>;
}

/// `modules.logger`: forwards to the host's `log` output with a `script`
/// target so script noise can be filtered separately.
pub struct LogCapability;

impl LuaCapability for LogCapability {
    fn name(&self) -> &str {
        well_known::LOGGER
    }

    fn register(&self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set(
            "debug",
            lua.create_function(|_, message: String| {
                debug!(target: "script", "{message}");
                Ok(())
            })?,
        )?;
        table.set(
            "info",
            lua.create_function(|_, message: String| {
                info!(target: "script", "{message}");
                Ok(())
            })?,
        )?;
        table.set(
            "warn",
            lua.create_function(|_, message: String| {
                warn!(target: "script", "{message}");
                Ok(())
            })?,
        )?;
        table.set(
            "error",
            lua.create_function(|_, message: String| {
                error!(target: "script", "{message}");
                Ok(())
            })?,
        )?;
        Ok(LuaValue::Table(table))
    }
}

/// `modules.fs`: raw filesystem checks and path expansion.
pub struct FsCapability;

impl LuaCapability for FsCapability {
    fn name(&self) -> &str {
        well_known::FS
    }

    fn register(&self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;

        // fs.readable(path) -> boolean
        // Follows symlinks; broken symlinks return false. Never throws.
        table.set(
            "readable",
            lua.create_function(|_, path: String| Ok(std::fs::File::open(&path).is_ok()))?,
        )?;

        // fs.exists(path) -> boolean
        table.set(
            "exists",
            lua.create_function(|_, path: String| Ok(Path::new(&path).exists()))?,
        )?;

        // fs.expand(path) -> string
        // Expands `~`, `$VAR`, and `${VAR}`. Unset variables expand to the
        // empty string; returns the original path on failure.
        table.set(
            "expand",
            lua.create_function(|_, path: String| {
                let home_dir: Option<String> =
                    dirs::home_dir().map(|p| p.to_string_lossy().into_owned());
                let result = shellexpand::full_with_context_no_errors(
                    &path,
                    || home_dir.as_deref(),
                    |var| Some(std::env::var(var).unwrap_or_default()),
                );
                Ok(result.into_owned())
            })?,
        )?;

        // fs.read(path) -> string | nil
        table.set(
            "read",
            lua.create_function(|_, path: String| Ok(std::fs::read_to_string(&path).ok()))?,
        )?;

        Ok(LuaValue::Table(table))
    }
}

/// `modules.path`: path manipulation without touching the filesystem.
pub struct PathCapability;

impl LuaCapability for PathCapability {
    fn name(&self) -> &str {
        well_known::PATH
    }

    fn register(&self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;

        table.set(
            "join",
            lua.create_function(|_, (base, leaf): (String, String)| {
                Ok(Path::new(&base).join(&leaf).to_string_lossy().into_owned())
            })?,
        )?;

        table.set(
            "basename",
            lua.create_function(|_, path: String| {
                Ok(Path::new(&path)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned()))
            })?,
        )?;

        table.set(
            "dirname",
            lua.create_function(|_, path: String| {
                Ok(Path::new(&path)
                    .parent()
                    .map(|parent| parent.to_string_lossy().into_owned()))
            })?,
        )?;

        table.set(
            "extension",
            lua.create_function(|_, path: String| {
                Ok(Path::new(&path)
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned()))
            })?,
        )?;

        Ok(LuaValue::Table(table))
    }
}

/// Build the `modules` table for one invocation.
///
/// Bridged entries get their real Lua value; everything else in the registry
/// becomes a stub table `{ name = "<entry>" }`.
pub fn build_modules_table(
    lua: &Lua,
    registry: &CapabilityRegistry,
    bridges: &[Box<dyn LuaCapability>],
) -> LuaResult<LuaTable> {
    let modules = lua.create_table()?;
    for name in registry.names() {
        let value = match bridges.iter().find(|bridge| bridge.name() == name) {
            Some(bridge) => bridge.register(lua)?,
            None => {
                let stub = lua.create_table()?;
                stub.set("name", name)?;
                LuaValue::Table(stub)
            }
        };
        modules.set(name, value)?;
    }
    Ok(modules)
}

/// The bridges this layer provides out of the box.
pub fn default_bridges() -> Vec<Box<dyn LuaCapability>> {
    vec![
        Box::new(LogCapability),
        Box::new(FsCapability),
        Box::new(PathCapability),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::builder()
            .fill_placeholders()
            .build()
            .unwrap()
    }

    #[test]
    fn modules_table_covers_every_registry_entry() {
        let lua = Lua::new();
        let registry = registry();
        let modules = build_modules_table(&lua, &registry, &default_bridges()).unwrap();

        for &name in well_known::FIXED {
            let value: LuaValue = modules.get(name).unwrap();
            assert!(value.is_table(), "modules.{name} should be a table");
        }
    }

    #[test]
    fn unbridged_entries_are_named_stubs() {
        let lua = Lua::new();
        let modules = build_modules_table(&lua, &registry(), &default_bridges()).unwrap();
        let chat: LuaTable = modules.get(well_known::TWITCH_CHAT).unwrap();
        let name: String = chat.get("name").unwrap();
        assert_eq!(name, well_known::TWITCH_CHAT);
    }

    #[test]
    fn path_capability_manipulates_paths() {
        let lua = Lua::new();
        let modules = build_modules_table(&lua, &registry(), &default_bridges()).unwrap();
        lua.globals().set("modules", modules).unwrap();

        let joined: String = lua
            .load(r#"return modules.path.join("/tmp", "scripts")"#)
            .eval()
            .unwrap();
        assert_eq!(joined, "/tmp/scripts");

        let ext: Option<String> = lua
            .load(r#"return modules.path.extension("greeter.lua")"#)
            .eval()
            .unwrap();
        assert_eq!(ext.as_deref(), Some("lua"));
    }

    #[test]
    fn fs_capability_reports_readability() {
        let lua = Lua::new();
        let modules = build_modules_table(&lua, &registry(), &default_bridges()).unwrap();
        lua.globals().set("modules", modules).unwrap();

        let readable: bool = lua
            .load(r#"return modules.fs.readable("/definitely/not/here.txt")"#)
            .eval()
            .unwrap();
        assert!(!readable);
    }
}
