//! Contract between the Ember host and third-party extension scripts.
//!
//! A script declares its identity ([`ScriptManifest`]), its configurable
//! parameters ([`ParameterSchema`] of [`ParameterDescriptor`]s, checked
//! against the declared bag type by the [`resolver`]), and one behavioral
//! operation, `run`, which receives a [`RunRequest`] (resolved parameters,
//! injected [`CapabilityRegistry`], account/session context, trigger) and
//! yields a [`RunResult`], synchronously or through a pending
//! [`ScriptOutcome`].
//!
//! This crate is the contract only: no UI rendering, no effect execution,
//! no capability implementations. The Lua host layer lives in `ember-lua`.

pub mod effects;
pub mod error;
pub mod manifest;
pub mod parameter;
pub mod registry;
pub mod resolver;
pub mod run;
pub mod schema;
pub mod script;
pub mod value;

pub use effects::{Effect, EffectList, EffectsPayload, Trigger};
pub use error::{SchemaMismatch, ScriptError};
pub use manifest::{ScriptManifest, HOST_MAJOR_VERSION};
pub use parameter::{
    BaseParameter, BooleanParameter, EffectListParameter, EnumOption, EnumParameter, FileFilter,
    FileOptions, FilepathParameter, NumberParameter, ParameterDescriptor, ParameterKind,
    PasswordParameter, StringParameter,
};
pub use registry::{well_known, Capability, CapabilityRegistry, Placeholder, RegistryBuilder};
pub use run::{
    AccountAuth, Accounts, HostContext, HostSettings, RunCallback, RunRequest, RunResult,
    ScriptOutcome, UserAccount,
};
pub use schema::ParameterSchema;
pub use script::{interpret, register_script, CustomScript, RegisteredScript, RunDisposition};
pub use value::{BagType, ParameterBag, ParameterValue, ValueKind};
