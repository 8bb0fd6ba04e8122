//! The capability registry injected into every script invocation.
//!
//! Capabilities are host-owned, process-lifetime objects (command manager,
//! currency manager, logger, filesystem utilities, …) handed to scripts by
//! reference. Scripts invoke operations on them but never own, replace, or
//! remove entries. A fixed set of names is always present; hosts may add
//! arbitrary further entries under their own names.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ScriptError;

/// Stable names of the fixed capability set. Scripts may rely on these
/// across host versions within the same major-version contract.
pub mod well_known {
    pub const COMMAND_MANAGER: &str = "commandManager";
    pub const COUNTER_MANAGER: &str = "counterManager";
    pub const CURRENCY_DB: &str = "currencyDb";
    pub const CURRENCY_MANAGER: &str = "currencyManager";
    pub const CUSTOM_VARIABLE_MANAGER: &str = "customVariableManager";
    pub const EFFECT_MANAGER: &str = "effectManager";
    pub const EVENT_FILTER_MANAGER: &str = "eventFilterManager";
    pub const EVENT_MANAGER: &str = "eventManager";
    pub const FIREBOT_ROLES_MANAGER: &str = "firebotRolesManager";
    pub const FRONTEND_COMMUNICATOR: &str = "frontendCommunicator";
    pub const FS: &str = "fs";
    pub const GAME_MANAGER: &str = "gameManager";
    pub const LOGGER: &str = "logger";
    pub const PATH: &str = "path";
    pub const QUOTES_MANAGER: &str = "quotesManager";
    pub const REPLACE_VARIABLE_MANAGER: &str = "replaceVariableManager";
    pub const TWITCH_API: &str = "twitchApi";
    pub const TWITCH_CHAT: &str = "twitchChat";
    pub const USER_DB: &str = "userDb";
    pub const UTILS: &str = "utils";

    /// Every name a registry must contain.
    pub const FIXED: &[&str] = &[
        COMMAND_MANAGER,
        COUNTER_MANAGER,
        CURRENCY_DB,
        CURRENCY_MANAGER,
        CUSTOM_VARIABLE_MANAGER,
        EFFECT_MANAGER,
        EVENT_FILTER_MANAGER,
        EVENT_MANAGER,
        FIREBOT_ROLES_MANAGER,
        FRONTEND_COMMUNICATOR,
        FS,
        GAME_MANAGER,
        LOGGER,
        PATH,
        QUOTES_MANAGER,
        REPLACE_VARIABLE_MANAGER,
        TWITCH_API,
        TWITCH_CHAT,
        USER_DB,
        UTILS,
    ];
}

/// An opaque host-owned capability handle.
pub type Capability = Arc<dyn Any + Send + Sync>;

/// Inert handle installed for fixed entries a partial host does not back
/// with a real subsystem. Keeps `get` lookups total.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholder;

/// Read-only named capability map, shared across all invocations.
#[derive(Clone)]
pub struct CapabilityRegistry {
    entries: IndexMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            entries: IndexMap::new(),
        }
    }

    /// Untyped lookup, the open escape hatch for host-specific entries.
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    /// Typed lookup for well-known entries.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name)?.clone().downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct RegistryBuilder {
    entries: IndexMap<String, Capability>,
}

impl RegistryBuilder {
    /// Install a capability under a name. Later entries under the same name
    /// replace earlier ones.
    pub fn provide<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.entries.insert(name.into(), Arc::new(value));
        self
    }

    /// Install an already-shared capability handle.
    pub fn provide_shared(mut self, name: impl Into<String>, value: Capability) -> Self {
        self.entries.insert(name.into(), value);
        self
    }

    /// Install [`Placeholder`] handles for every fixed entry not yet
    /// provided. Meant for tests and partial hosts.
    pub fn fill_placeholders(mut self) -> Self {
        for &name in well_known::FIXED {
            if !self.entries.contains_key(name) {
                self.entries.insert(name.to_owned(), Arc::new(Placeholder));
            }
        }
        self
    }

    /// Finish the registry; every fixed entry must be present.
    pub fn build(self) -> Result<CapabilityRegistry, ScriptError> {
        for &name in well_known::FIXED {
            if !self.entries.contains_key(name) {
                return Err(ScriptError::MissingCapability {
                    name: name.to_owned(),
                });
            }
        }
        Ok(CapabilityRegistry {
            entries: self.entries,
        })
    }
}
