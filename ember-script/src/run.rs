//! Run request and run result envelopes.
//!
//! A run request is built fresh per trigger and discarded once the result is
//! consumed; nothing in it may be reused across invocations except the
//! shared capability registry. The run result is the script's only channel
//! back to the host.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::effects::{EffectsPayload, Trigger};
use crate::error::ScriptError;
use crate::registry::CapabilityRegistry;
use crate::schema::ParameterSchema;
use crate::value::ParameterBag;

/// Read-only snapshot of one of the host's connected accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub username: String,
    pub display_name: String,
    pub user_id: String,
    pub avatar: String,
    pub logged_in: bool,
    pub auth: AccountAuth,
}

/// OAuth token triple. Wire keys are snake_case, matching the token
/// endpoint payload the host stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAuth {
    pub access_token: String,
    pub expires_at: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accounts {
    pub streamer: UserAccount,
    pub bot: UserAccount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSettings {
    pub web_server_port: u16,
}

/// Host-side context embedded in every run request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostContext {
    pub accounts: Accounts,
    pub settings: HostSettings,
    /// Full host version string (the manifest gate only checks the major).
    pub version: String,
}

/// Immutable envelope for one script invocation.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub parameters: ParameterBag,
    pub modules: Arc<CapabilityRegistry>,
    pub firebot: HostContext,
    pub trigger: Trigger,
}

impl RunRequest {
    /// Build a request by resolving user overrides against the script's
    /// schema. The resolved bag covers every schema field.
    pub fn build(
        schema: &ParameterSchema,
        overrides: &ParameterBag,
        modules: Arc<CapabilityRegistry>,
        firebot: HostContext,
        trigger: Trigger,
    ) -> Result<Self, ScriptError> {
        let parameters = schema.resolve(overrides)?;
        Ok(Self {
            parameters,
            modules,
            firebot,
            trigger,
        })
    }

    /// Build a request from an already-resolved bag. Missing schema fields
    /// are a configuration error; extra fields are silently dropped.
    pub fn from_bag(
        schema: &ParameterSchema,
        bag: ParameterBag,
        modules: Arc<CapabilityRegistry>,
        firebot: HostContext,
        trigger: Trigger,
    ) -> Result<Self, ScriptError> {
        let mut parameters = ParameterBag::with_capacity(schema.len());
        for (field, _) in schema.iter() {
            match bag.get(field) {
                Some(value) => {
                    parameters.insert(field.clone(), value.clone());
                }
                None => {
                    return Err(ScriptError::MissingParameter {
                        field: field.clone(),
                    })
                }
            }
        }
        Ok(Self {
            parameters,
            modules,
            firebot,
            trigger,
        })
    }
}

/// Zero-argument completion hook the host invokes after effect execution.
/// Lua scripts are main-thread-bound, so this is not required to be `Send`.
pub type RunCallback = Box<dyn FnOnce()>;

/// What a script hands back to the host.
pub struct RunResult {
    pub success: bool,
    /// Meaningful only when `success` is false.
    pub error_message: Option<String>,
    pub effects: EffectsPayload,
    pub callback: Option<RunCallback>,
}

impl RunResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error_message: None,
            effects: EffectsPayload::default(),
            callback: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            effects: EffectsPayload::default(),
            callback: None,
        }
    }

    pub fn with_effects(mut self, effects: EffectsPayload) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_callback(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunResult")
            .field("success", &self.success)
            .field("error_message", &self.error_message)
            .field("effects", &self.effects)
            .field("callback", &self.callback.as_ref().map(|_| ".."))
            .finish()
    }
}

/// The uniform return of `run`: completed synchronously, or completion
/// pending on a channel the script holds the sending side of.
pub enum ScriptOutcome {
    Done(RunResult),
    Pending(async_channel::Receiver<RunResult>),
}

impl ScriptOutcome {
    /// A `run` that produced no value: success with zero effects.
    pub fn fire_and_forget() -> Self {
        ScriptOutcome::Done(RunResult::success())
    }

    /// Channel pair for a script completing asynchronously. The script keeps
    /// the sender and sends exactly one result.
    pub fn pending() -> (async_channel::Sender<RunResult>, Self) {
        let (tx, rx) = async_channel::bounded(1);
        (tx, ScriptOutcome::Pending(rx))
    }

    /// Collapse both shapes into one eventual result. A script that drops
    /// its sender without sending counts as a rejected run.
    pub async fn resolve(self) -> Result<RunResult, ScriptError> {
        match self {
            ScriptOutcome::Done(result) => Ok(result),
            ScriptOutcome::Pending(rx) => rx.recv().await.map_err(|_| ScriptError::RunRejected {
                message: "script dropped its pending result".to_owned(),
            }),
        }
    }
}

impl From<RunResult> for ScriptOutcome {
    fn from(result: RunResult) -> Self {
        ScriptOutcome::Done(result)
    }
}

impl From<()> for ScriptOutcome {
    fn from(_: ()) -> Self {
        ScriptOutcome::fire_and_forget()
    }
}

impl fmt::Debug for ScriptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptOutcome::Done(result) => f.debug_tuple("Done").field(result).finish(),
            ScriptOutcome::Pending(_) => f.debug_tuple("Pending").field(&"..").finish(),
        }
    }
}
