//! Lua host layer for the Ember script contract.
//!
//! Loads third-party extension scripts written in Luau, checks them against
//! the `ember-script` contract at registration time, and invokes them with
//! timeout protection. A script is a chunk returning a table with
//! `getScriptManifest`, `getDefaultParameters`, and `run`:
//!
//! ```lua
//! return {
//!     getScriptManifest = function()
//!         return {
//!             name = "Greeter",
//!             description = "Greets chat",
//!             version = "1.0.0",
//!             author = "someone",
//!             firebotVersion = "5",
//!         }
//!     end,
//!     getDefaultParameters = function()
//!         return {
//!             greeting = { type = "string", default = "Hello!" },
//!         }
//!     end,
//!     run = function(runRequest)
//!         runRequest.modules.logger.info(runRequest.parameters.greeting)
//!         return {
//!             success = true,
//!             effects = { { type = "chat", message = runRequest.parameters.greeting } },
//!         }
//!     end,
//! }
//! ```

pub mod capabilities;
pub mod convert;
pub mod host;

pub use capabilities::{
    build_modules_table, default_bridges, FsCapability, LogCapability, LuaCapability,
    PathCapability,
};
pub use host::{
    default_script_paths, discover_scripts, ExecutionLimits, HostError, LoadedScript,
    LuaRegistration, ScriptCandidate, ScriptHost,
};
