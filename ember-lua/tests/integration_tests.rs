//! End-to-end tests: script on disk through load, registration, and
//! invocation on a live host.

mod common;

use std::time::Duration;

use ember_script::{
    interpret, EffectsPayload, ParameterBag, ParameterValue, RunDisposition, ScriptError,
    ScriptOutcome, Trigger, HOST_MAJOR_VERSION,
};
use ember_lua::{ExecutionLimits, HostError, ScriptHost};
use tempfile::TempDir;

const GREETER: &str = r#"
return {
    getScriptManifest = function()
        return {
            name = "Greeter",
            description = "Greets chat",
            version = "1.2.0",
            author = "someone",
            firebotVersion = "5",
        }
    end,
    getDefaultParameters = function()
        return {
            greeting = { type = "string", default = "Hello!" },
            repeats = { type = "number", default = 1 },
        }
    end,
    parameterTypes = { greeting = "string", repeats = "number" },
    run = function(runRequest)
        local effects = {}
        for i = 1, runRequest.parameters.repeats do
            effects[i] = { type = "chat", message = runRequest.parameters.greeting }
        end
        return { success = true, effects = effects }
    end,
}
"#;

#[test]
fn greeter_runs_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = common::write_script(&dir, "greeter.lua", GREETER);

    let host = ScriptHost::new().unwrap();
    let script = host.load_script("greeter", &path).unwrap();
    let registration = host.register(&script, HOST_MAJOR_VERSION).unwrap();
    assert_eq!(registration.manifest.name, "Greeter");
    assert_eq!(registration.schema.len(), 2);

    let overrides = ParameterBag::from_iter([
        (
            "greeting".to_owned(),
            ParameterValue::String("Welcome!".to_owned()),
        ),
        ("repeats".to_owned(), ParameterValue::Number(2.0)),
    ]);
    let request = common::request(&registration.schema, &overrides, Trigger::new("command"));

    let ScriptOutcome::Done(result) = host.invoke(&script, &request).unwrap() else {
        panic!("lua scripts settle synchronously");
    };
    match interpret("greeter", result) {
        RunDisposition::Succeeded { effects, callback } => {
            let EffectsPayload::List(effects) = effects else {
                panic!("expected a plain effect list");
            };
            assert_eq!(effects.len(), 2);
            assert_eq!(effects[0].effect_type, "chat");
            assert_eq!(
                effects[0].data.get("message").and_then(|v| v.as_str()),
                Some("Welcome!")
            );
            assert!(callback.is_none());
        }
        RunDisposition::Failed { message } => panic!("unexpected failure: {message}"),
    }
}

#[test]
fn nil_return_counts_as_success_with_no_effects() {
    let dir = TempDir::new().unwrap();
    let path = common::write_script(
        &dir,
        "quiet.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Quiet", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "5" }
            end,
            getDefaultParameters = function() return {} end,
            run = function(runRequest) end,
        }"#,
    );

    let host = ScriptHost::new().unwrap();
    let script = host.load_script("quiet", &path).unwrap();
    let registration = host.register(&script, HOST_MAJOR_VERSION).unwrap();
    let request = common::request(&registration.schema, &ParameterBag::new(), Trigger::new("manual"));

    let ScriptOutcome::Done(result) = host.invoke(&script, &request).unwrap() else {
        panic!("lua scripts settle synchronously");
    };
    assert!(result.success);
    assert!(result.effects.is_empty());
    assert!(result.callback.is_none());
}

#[test]
fn reported_failure_surfaces_its_message() {
    let dir = TempDir::new().unwrap();
    let path = common::write_script(
        &dir,
        "grumpy.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Grumpy", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "5" }
            end,
            getDefaultParameters = function() return {} end,
            run = function(runRequest)
                return { success = false, errorMessage = "bad input" }
            end,
        }"#,
    );

    let host = ScriptHost::new().unwrap();
    let script = host.load_script("grumpy", &path).unwrap();
    let registration = host.register(&script, HOST_MAJOR_VERSION).unwrap();
    let request = common::request(&registration.schema, &ParameterBag::new(), Trigger::new("manual"));

    let ScriptOutcome::Done(result) = host.invoke(&script, &request).unwrap() else {
        panic!("lua scripts settle synchronously");
    };
    match interpret("grumpy", result) {
        RunDisposition::Failed { message } => assert_eq!(message, "bad input"),
        RunDisposition::Succeeded { .. } => panic!("expected failure"),
    }
}

#[test]
fn declared_parameter_types_gate_registration() {
    let dir = TempDir::new().unwrap();
    let path = common::write_script(
        &dir,
        "lying.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Lying", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "5" }
            end,
            getDefaultParameters = function()
                return { enabled = { type = "string", default = "yes" } }
            end,
            parameterTypes = { enabled = "boolean" },
            run = function(runRequest) end,
        }"#,
    );

    let host = ScriptHost::new().unwrap();
    let script = host.load_script("lying", &path).unwrap();
    let err = host.register(&script, HOST_MAJOR_VERSION).unwrap_err();
    assert!(matches!(
        err,
        HostError::Contract(ScriptError::SchemaMismatch { .. })
    ));
}

#[test]
fn wrong_major_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = common::write_script(
        &dir,
        "old.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Old", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "4" }
            end,
            getDefaultParameters = function() return {} end,
            run = function(runRequest) end,
        }"#,
    );

    let host = ScriptHost::new().unwrap();
    let script = host.load_script("old", &path).unwrap();
    let err = host.register(&script, HOST_MAJOR_VERSION).unwrap_err();
    assert!(matches!(
        err,
        HostError::Contract(ScriptError::ManifestIncompatible { .. })
    ));
}

#[test]
fn runaway_run_is_rejected_without_killing_the_host() {
    let dir = TempDir::new().unwrap();
    let spin = common::write_script(
        &dir,
        "spin.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Spin", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "5" }
            end,
            getDefaultParameters = function() return {} end,
            run = function(runRequest) while true do end end,
        }"#,
    );
    let quick = common::write_script(
        &dir,
        "quick.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Quick", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "5" }
            end,
            getDefaultParameters = function() return {} end,
            run = function(runRequest) return { success = true } end,
        }"#,
    );

    let host =
        ScriptHost::with_limits(ExecutionLimits::with_timeout(Duration::from_millis(50))).unwrap();

    let spin_script = host.load_script("spin", &spin).unwrap();
    let spin_reg = host.register(&spin_script, HOST_MAJOR_VERSION).unwrap();
    let request = common::request(&spin_reg.schema, &ParameterBag::new(), Trigger::new("manual"));
    let err = host.invoke(&spin_script, &request).unwrap_err();
    match err {
        ScriptError::RunRejected { message } => {
            assert!(message.contains("timeout"), "got: {message}");
        }
        other => panic!("expected a rejected run, got {other:?}"),
    }

    // The runtime survives; other scripts keep working.
    let quick_script = host.load_script("quick", &quick).unwrap();
    let quick_reg = host.register(&quick_script, HOST_MAJOR_VERSION).unwrap();
    let request = common::request(&quick_reg.schema, &ParameterBag::new(), Trigger::new("manual"));
    let ScriptOutcome::Done(result) = host.invoke(&quick_script, &request).unwrap() else {
        panic!("lua scripts settle synchronously");
    };
    assert!(result.success);
}

#[test]
fn thrown_error_is_rejected_with_its_message() {
    let dir = TempDir::new().unwrap();
    let path = common::write_script(
        &dir,
        "thrower.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Thrower", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "5" }
            end,
            getDefaultParameters = function() return {} end,
            run = function(runRequest) error("boom") end,
        }"#,
    );

    let host = ScriptHost::new().unwrap();
    let script = host.load_script("thrower", &path).unwrap();
    let registration = host.register(&script, HOST_MAJOR_VERSION).unwrap();
    let request = common::request(&registration.schema, &ParameterBag::new(), Trigger::new("manual"));

    let err = host.invoke(&script, &request).unwrap_err();
    match err {
        ScriptError::RunRejected { message } => assert!(message.contains("boom"), "got: {message}"),
        other => panic!("expected a rejected run, got {other:?}"),
    }
}

#[test]
fn each_invocation_sees_only_its_own_request() {
    let dir = TempDir::new().unwrap();
    let path = common::write_script(
        &dir,
        "echo.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Echo", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "5" }
            end,
            getDefaultParameters = function()
                return { word = { type = "string", default = "default" } }
            end,
            run = function(runRequest)
                local word = runRequest.parameters.word
                -- Scribbling on the request must not leak into later runs.
                runRequest.parameters.word = "tainted"
                return {
                    success = true,
                    effects = { { type = "chat", message = word .. "/" .. runRequest.trigger.type } },
                }
            end,
        }"#,
    );

    let host = ScriptHost::new().unwrap();
    let script = host.load_script("echo", &path).unwrap();
    let registration = host.register(&script, HOST_MAJOR_VERSION).unwrap();

    let first_overrides =
        ParameterBag::from_iter([("word".to_owned(), ParameterValue::String("one".to_owned()))]);
    let first = common::request(&registration.schema, &first_overrides, Trigger::new("command"));
    let second = common::request(&registration.schema, &ParameterBag::new(), Trigger::new("event"));

    let message_of = |outcome: ScriptOutcome| -> String {
        let ScriptOutcome::Done(result) = outcome else {
            panic!("lua scripts settle synchronously");
        };
        let EffectsPayload::List(effects) = result.effects else {
            panic!("expected a plain effect list");
        };
        effects[0]
            .data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap()
            .to_owned()
    };

    assert_eq!(
        message_of(host.invoke(&script, &first).unwrap()),
        "one/command"
    );
    assert_eq!(
        message_of(host.invoke(&script, &second).unwrap()),
        "default/event"
    );
}

#[test]
fn callback_runs_after_the_result_settles() {
    let dir = TempDir::new().unwrap();
    let path = common::write_script(
        &dir,
        "hooked.lua",
        r#"return {
            getScriptManifest = function()
                return { name = "Hooked", description = "", version = "0.1.0",
                         author = "a", firebotVersion = "5" }
            end,
            getDefaultParameters = function() return {} end,
            run = function(runRequest)
                if fired then
                    return { success = false, errorMessage = "already fired" }
                end
                return {
                    success = true,
                    callback = function() fired = true end,
                }
            end,
        }"#,
    );

    let host = ScriptHost::new().unwrap();
    let script = host.load_script("hooked", &path).unwrap();
    let registration = host.register(&script, HOST_MAJOR_VERSION).unwrap();
    let request = common::request(&registration.schema, &ParameterBag::new(), Trigger::new("manual"));

    let ScriptOutcome::Done(result) = host.invoke(&script, &request).unwrap() else {
        panic!("lua scripts settle synchronously");
    };
    match interpret("hooked", result) {
        RunDisposition::Succeeded { callback, .. } => callback.expect("callback promised")(),
        RunDisposition::Failed { message } => panic!("unexpected failure: {message}"),
    }

    // The callback observably ran: the next invocation sees its effect.
    let request = common::request(&registration.schema, &ParameterBag::new(), Trigger::new("manual"));
    let ScriptOutcome::Done(result) = host.invoke(&script, &request).unwrap() else {
        panic!("lua scripts settle synchronously");
    };
    assert!(!result.success);
    assert_eq!(result.error_message.as_deref(), Some("already fired"));
}
