//! The Lua script host: discovery, loading, registration, invocation.
//!
//! Scripts are Luau chunks that return a table exposing the three contract
//! operations under their fixed names:
//!
//! ```lua
//! return {
//!     getScriptManifest = function() ... end,
//!     getDefaultParameters = function() ... end,
//!     run = function(runRequest) ... end,
//!     -- optional: declared value type per parameter field
//!     parameterTypes = { retries = "number" },
//! }
//! ```
//!
//! # Timeout Protection
//!
//! Luau's `set_interrupt` fires periodically during execution, even in
//! optimized code, which allows wall-clock timeout protection without a
//! watchdog thread. A timed-out `run` is reported as a rejected run; it
//! never blocks other invocations. This is the host-side policy for the
//! contract's unanswered "what if `run` never settles" question.
//!
//! # Script Locations
//!
//! - `$XDG_CONFIG_HOME/ember/scripts/` (defaults to `~/.config/ember/scripts/`)
//! - `$XDG_DATA_HOME/ember/scripts/` (defaults to `~/.local/share/ember/scripts/`)
//! - `/usr/share/ember/scripts/`
//!
//! A script is either a single `name.lua` file or a `name/init.lua` package.

use std::cell::Cell;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use ember_script::{
    BagType, ParameterSchema, RunRequest, ScriptError, ScriptManifest, ScriptOutcome,
};
use log::{debug, info, warn};
use mlua::prelude::*;
use mlua::Compiler;
use thiserror::Error;

use crate::capabilities::{self, LuaCapability};
use crate::convert;

/// Wall-clock limits for script execution.
///
/// Applies to every contract operation the host calls, not just `run`:
/// a manifest getter that spins forever blocks registration, nothing else.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Maximum wall-clock time per call (`Duration::ZERO` = unlimited).
    pub timeout: Duration,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl ExecutionLimits {
    /// No timeout. Only for trusted scripts.
    pub fn unlimited() -> Self {
        Self {
            timeout: Duration::ZERO,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Failures while loading or registering a script. Fatal to that script
/// only; the host keeps running everything else.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Contract(#[from] ScriptError),
    #[error("lua: {0}")]
    Lua(#[from] LuaError),
}

/// A script file found on disk, not yet loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCandidate {
    pub name: String,
    pub path: PathBuf,
}

/// Default script search paths, user config first, system last.
pub fn default_script_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let config_home = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")));
    if let Some(config_dir) = config_home {
        paths.push(config_dir.join("ember/scripts"));
    }

    let data_home = env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")));
    if let Some(data_dir) = data_home {
        paths.push(data_dir.join("ember/scripts"));
    }

    paths.push(PathBuf::from("/usr/share/ember/scripts"));
    paths
}

/// Enumerate script candidates under the given search paths.
///
/// A name found under an earlier search path shadows the same name under a
/// later one. Unreadable directories are logged and skipped, never fatal.
pub fn discover_scripts(search_paths: &[PathBuf]) -> Vec<ScriptCandidate> {
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for search_path in search_paths {
        if !search_path.exists() {
            debug!("script search path does not exist: {}", search_path.display());
            continue;
        }

        let entries = match fs::read_dir(search_path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "failed to read script directory {}: {err}",
                    search_path.display()
                );
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("error reading script directory entry: {err}");
                    continue;
                }
            };
            let path = entry.path();

            if path.is_file() && path.extension().is_some_and(|ext| ext == "lua") {
                if let Some(stem) = path.file_stem() {
                    let name = stem.to_string_lossy().to_string();
                    if name == "init" {
                        continue;
                    }
                    if seen.insert(name.clone()) {
                        candidates.push(ScriptCandidate { name, path });
                    } else {
                        debug!(
                            "script `{name}` at {} shadowed by an earlier search path",
                            path.display()
                        );
                    }
                }
            } else if path.is_dir() && path.join("init.lua").exists() {
                if let Some(dir_name) = path.file_name() {
                    let name = dir_name.to_string_lossy().to_string();
                    if seen.insert(name.clone()) {
                        candidates.push(ScriptCandidate { name, path });
                    } else {
                        debug!(
                            "script `{name}` at {} shadowed by an earlier search path",
                            path.display()
                        );
                    }
                }
            }
        }
    }

    info!("discovered {} scripts", candidates.len());
    candidates
}

/// A loaded script: the table its chunk returned, with the three contract
/// operations resolved. Tied to the [`ScriptHost`] that loaded it.
#[derive(Debug)]
pub struct LoadedScript {
    pub name: String,
    pub path: PathBuf,
    manifest_fn: LuaFunction,
    parameters_fn: LuaFunction,
    run_fn: LuaFunction,
    /// Declared bag type from the optional `parameterTypes` table.
    declared: Option<BagType>,
}

/// A script that passed the registration gate and may be invoked.
#[derive(Debug, Clone)]
pub struct LuaRegistration {
    pub manifest: ScriptManifest,
    pub schema: ParameterSchema,
}

/// Owns one Lua runtime and hosts any number of scripts on it.
///
/// All scripts on one host share the runtime and are therefore invoked from
/// one thread; isolation between invocations comes from the per-invocation
/// run request table, not from VM separation.
pub struct ScriptHost {
    lua: Lua,
    compiler: Compiler,
    limits: ExecutionLimits,
    deadline: Rc<Cell<Option<Instant>>>,
    bridges: Vec<Box<dyn LuaCapability>>,
}

impl ScriptHost {
    pub fn new() -> LuaResult<Self> {
        Self::with_limits(ExecutionLimits::default())
    }

    pub fn with_limits(limits: ExecutionLimits) -> LuaResult<Self> {
        let lua = Lua::new();
        lua.load_std_libs(LuaStdLib::ALL_SAFE)?;

        let deadline = Rc::new(Cell::new(None::<Instant>));
        if limits.timeout > Duration::ZERO {
            let deadline_clone = deadline.clone();
            lua.set_interrupt(move |_lua| {
                if let Some(dl) = deadline_clone.get() {
                    if Instant::now() > dl {
                        return Err(LuaError::external("script execution timeout"));
                    }
                }
                Ok(LuaVmState::Continue)
            });
        }

        // Level 2 enables inlining, loop unrolling, and constant folding;
        // debug level 1 keeps line info for script error messages.
        let compiler = Compiler::new().set_optimization_level(2).set_debug_level(1);

        Ok(Self {
            lua,
            compiler,
            limits,
            deadline,
            bridges: capabilities::default_bridges(),
        })
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Install an additional capability bridge. Later bridges for the same
    /// name shadow earlier ones, including the built-ins.
    pub fn add_bridge(&mut self, bridge: Box<dyn LuaCapability>) {
        self.bridges.insert(0, bridge);
    }

    fn set_deadline(&self) {
        if self.limits.timeout > Duration::ZERO {
            self.deadline
                .set(Some(Instant::now() + self.limits.timeout));
        }
    }

    fn clear_deadline(&self) {
        self.deadline.set(None);
    }

    fn call_with_timeout<R: mlua::FromLuaMulti>(
        &self,
        callback: &LuaFunction,
        args: impl mlua::IntoLuaMulti,
    ) -> LuaResult<R> {
        self.set_deadline();
        let result = callback.call::<R>(args);
        self.clear_deadline();
        result
    }

    /// Load a script chunk and resolve the contract operations.
    ///
    /// `path` may be the `.lua` file itself or a package directory holding
    /// an `init.lua`.
    pub fn load_script(&self, name: &str, path: &Path) -> LuaResult<LoadedScript> {
        let lua_file = if path.is_dir() {
            path.join("init.lua")
        } else {
            path.to_path_buf()
        };

        debug!("loading script `{name}` from {}", lua_file.display());
        let source = fs::read_to_string(&lua_file).map_err(|err| {
            LuaError::external(format!("failed to read {}: {err}", lua_file.display()))
        })?;
        let bytecode = self.compiler.compile(&source)?;

        self.set_deadline();
        let value = self.lua.load(bytecode).set_name(name).eval::<LuaValue>();
        self.clear_deadline();

        let table = match value? {
            LuaValue::Table(table) => table,
            other => {
                return Err(LuaError::external(format!(
                    "script `{name}` must return a table, found {}",
                    other.type_name()
                )))
            }
        };

        let required_fn = |field: &str| -> LuaResult<LuaFunction> {
            match table.get::<LuaValue>(field)? {
                LuaValue::Function(f) => Ok(f),
                _ => Err(LuaError::external(format!(
                    "script `{name}` does not expose `{field}`"
                ))),
            }
        };

        let manifest_fn = required_fn("getScriptManifest")?;
        let parameters_fn = required_fn("getDefaultParameters")?;
        let run_fn = required_fn("run")?;

        let declared = match table.get::<LuaValue>("parameterTypes")? {
            LuaValue::Table(t) => Some(convert::bag_type_from_lua(&t)?),
            _ => None,
        };

        Ok(LoadedScript {
            name: name.to_owned(),
            path: lua_file,
            manifest_fn,
            parameters_fn,
            run_fn,
            declared,
        })
    }

    /// Run the registration gate: manifest compatibility, intrinsic schema
    /// validation, and the resolver check when the script declares its
    /// bag type. Both getters are called with timeout protection.
    pub fn register(
        &self,
        script: &LoadedScript,
        host_major: &str,
    ) -> Result<LuaRegistration, HostError> {
        let manifest_value: LuaValue = self.call_with_timeout(&script.manifest_fn, ())?;
        let manifest_table = match manifest_value {
            LuaValue::Table(table) => table,
            other => {
                return Err(HostError::Lua(LuaError::external(format!(
                    "getScriptManifest must return a table, found {}",
                    other.type_name()
                ))))
            }
        };
        let manifest = convert::manifest_from_lua(&manifest_table)?;
        manifest.check_compatibility(host_major)?;

        let schema_value: LuaValue = self.call_with_timeout(&script.parameters_fn, ())?;
        let schema_table = match schema_value {
            LuaValue::Table(table) => table,
            other => {
                return Err(HostError::Lua(LuaError::external(format!(
                    "getDefaultParameters must return a table, found {}",
                    other.type_name()
                ))))
            }
        };
        let schema = convert::schema_from_lua(&schema_table)?;
        schema.validate()?;
        if let Some(declared) = &script.declared {
            schema.check_against(declared)?;
        }

        info!(
            "registered script `{}` v{} by {}",
            manifest.name, manifest.version, manifest.author
        );
        Ok(LuaRegistration { manifest, schema })
    }

    /// Invoke `run` once with a fresh request table.
    ///
    /// Anything that escapes the contract (a thrown Lua error, a timeout,
    /// a malformed result table) comes back as
    /// [`ScriptError::RunRejected`] and is local to this invocation.
    pub fn invoke(
        &self,
        script: &LoadedScript,
        request: &RunRequest,
    ) -> Result<ScriptOutcome, ScriptError> {
        debug!(
            "invoking `{}` (trigger: {})",
            script.name, request.trigger.trigger_type
        );

        let modules = capabilities::build_modules_table(&self.lua, &request.modules, &self.bridges)
            .map_err(reject)?;
        let request_table =
            convert::request_to_lua(&self.lua, request, modules).map_err(reject)?;

        let value: LuaValue = self
            .call_with_timeout(&script.run_fn, request_table)
            .map_err(reject)?;
        let result = convert::run_result_from_lua(value).map_err(reject)?;
        Ok(ScriptOutcome::Done(result))
    }
}

fn reject(err: LuaError) -> ScriptError {
    ScriptError::RunRejected {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    fn write_script(dir: &TempDir, name: &str, source: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(source.as_bytes()).unwrap();
        path
    }

    #[test]
    fn default_paths_are_not_empty() {
        assert!(!default_script_paths().is_empty());
    }

    #[test]
    fn discovery_finds_files_and_packages() {
        let dir = TempDir::new().unwrap();
        write_script(&dir, "greeter.lua", "return {}");
        fs::create_dir(dir.path().join("counter")).unwrap();
        fs::write(dir.path().join("counter/init.lua"), "return {}").unwrap();
        // Ignored: not a script.
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let mut names: Vec<String> = discover_scripts(&[dir.path().to_path_buf()])
            .into_iter()
            .map(|candidate| candidate.name)
            .collect();
        names.sort();
        assert_eq!(names, ["counter", "greeter"]);
    }

    #[test]
    fn earlier_search_paths_shadow_later_ones() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_script(&first, "greeter.lua", "return {}");
        write_script(&second, "greeter.lua", "return {}");
        write_script(&second, "extra.lua", "return {}");

        let candidates =
            discover_scripts(&[first.path().to_path_buf(), second.path().to_path_buf()]);
        let greeters: Vec<_> = candidates
            .iter()
            .filter(|candidate| candidate.name == "greeter")
            .collect();
        assert_eq!(greeters.len(), 1);
        assert_eq!(greeters[0].path, first.path().join("greeter.lua"));
        assert!(candidates.iter().any(|candidate| candidate.name == "extra"));
    }

    #[test]
    fn load_requires_the_three_operations() {
        let dir = TempDir::new().unwrap();
        let path = write_script(
            &dir,
            "partial.lua",
            r#"return {
                getScriptManifest = function() return {} end,
                getDefaultParameters = function() return {} end,
            }"#,
        );

        let host = ScriptHost::new().unwrap();
        let err = host.load_script("partial", &path).unwrap_err();
        assert!(err.to_string().contains("run"));
    }

    #[test]
    fn load_rejects_non_table_chunks() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "num.lua", "return 42");
        let host = ScriptHost::new().unwrap();
        assert!(host.load_script("num", &path).is_err());
    }

    #[test]
    fn runaway_chunk_is_terminated() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "spin.lua", "while true do end");
        let host =
            ScriptHost::with_limits(ExecutionLimits::with_timeout(Duration::from_millis(50)))
                .unwrap();
        let err = host.load_script("spin", &path).unwrap_err();
        assert!(err.to_string().contains("timeout"), "got: {err}");
    }
}
