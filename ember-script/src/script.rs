//! The script contract proper: the operations a script exposes, the
//! registration gate the host runs before ever invoking it, and how a run
//! result is interpreted.
//!
//! A single invocation moves Pending → Running → Succeeded/Failed. There is
//! no partial-effect state: on success the host executes the effects in
//! order and then the callback; on failure it surfaces the message and
//! executes nothing.

use log::{debug, warn};

use crate::error::ScriptError;
use crate::manifest::ScriptManifest;
use crate::run::{RunCallback, RunRequest, RunResult, ScriptOutcome};
use crate::schema::ParameterSchema;
use crate::value::BagType;

/// A third-party extension script implemented natively in Rust.
///
/// `manifest` and `default_parameters` must be idempotent and
/// side-effect-free; the host may call them speculatively. `run` is the sole
/// behavioral operation and is called at most once per invocation.
pub trait CustomScript {
    fn manifest(&self) -> ScriptManifest;

    /// The value type of each parameter field as `run` will read it.
    /// Checked against the schema at registration time.
    fn parameter_kinds(&self) -> BagType;

    fn default_parameters(&self) -> ParameterSchema;

    fn run(&mut self, request: RunRequest) -> ScriptOutcome;
}

/// A script that passed the registration gate.
#[derive(Debug)]
pub struct RegisteredScript<S> {
    script: S,
    manifest: ScriptManifest,
    schema: ParameterSchema,
}

/// Admit a script: compatibility gate, intrinsic descriptor validation,
/// then the resolver check against the declared bag type.
///
/// Any failure here is fatal to this script's registration and local to it.
pub fn register_script<S: CustomScript>(
    script: S,
    host_major: &str,
) -> Result<RegisteredScript<S>, ScriptError> {
    let manifest = script.manifest();
    manifest.check_compatibility(host_major)?;

    let schema = script.default_parameters();
    schema.validate()?;
    schema.check_against(&script.parameter_kinds())?;

    debug!(
        "registered script `{}` v{} ({} parameters)",
        manifest.name,
        manifest.version,
        schema.len()
    );
    Ok(RegisteredScript {
        script,
        manifest,
        schema,
    })
}

impl<S: CustomScript> RegisteredScript<S> {
    pub fn manifest(&self) -> &ScriptManifest {
        &self.manifest
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Start one invocation. At most one result comes back per call.
    pub fn invoke(&mut self, request: RunRequest) -> ScriptOutcome {
        debug!(
            "invoking `{}` (trigger: {})",
            self.manifest.name, request.trigger.trigger_type
        );
        self.script.run(request)
    }
}

/// What the host should do with a settled run result.
pub enum RunDisposition {
    /// Execute the effects in order, then invoke the callback.
    Succeeded {
        effects: crate::effects::EffectsPayload,
        callback: Option<RunCallback>,
    },
    /// Surface the message to the triggering context; execute nothing.
    Failed { message: String },
}

impl RunDisposition {
    /// A run that escaped the contract (threw, timed out, dropped its
    /// pending result). Equivalent to a failure with a generic message.
    pub fn rejected(message: impl Into<String>) -> Self {
        RunDisposition::Failed {
            message: message.into(),
        }
    }
}

/// Map a settled result onto the host's next step.
pub fn interpret(script_name: &str, result: RunResult) -> RunDisposition {
    if result.success {
        RunDisposition::Succeeded {
            effects: result.effects,
            callback: result.callback,
        }
    } else {
        let message = result
            .error_message
            .unwrap_or_else(|| "script reported failure without a message".to_owned());
        warn!("script `{script_name}` failed: {message}");
        RunDisposition::Failed { message }
    }
}
