//! Shared fixtures for ember-lua integration tests.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use ember_script::{
    AccountAuth, Accounts, CapabilityRegistry, HostContext, HostSettings, ParameterBag,
    ParameterSchema, RunRequest, Trigger, UserAccount,
};
use tempfile::TempDir;

pub fn write_script(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).expect("failed to write script fixture");
    path
}

pub fn registry() -> Arc<CapabilityRegistry> {
    Arc::new(
        CapabilityRegistry::builder()
            .fill_placeholders()
            .build()
            .expect("placeholder registry should build"),
    )
}

fn account(username: &str) -> UserAccount {
    UserAccount {
        username: username.to_owned(),
        display_name: username.to_owned(),
        user_id: "100".to_owned(),
        avatar: String::new(),
        logged_in: true,
        auth: AccountAuth {
            access_token: "token".to_owned(),
            expires_at: "2026-12-31T00:00:00Z".to_owned(),
            refresh_token: "refresh".to_owned(),
        },
    }
}

pub fn host_context() -> HostContext {
    HostContext {
        accounts: Accounts {
            streamer: account("streamer"),
            bot: account("bot"),
        },
        settings: HostSettings {
            web_server_port: 7472,
        },
        version: "5.63.2".to_owned(),
    }
}

pub fn request(
    schema: &ParameterSchema,
    overrides: &ParameterBag,
    trigger: Trigger,
) -> RunRequest {
    RunRequest::build(schema, overrides, registry(), host_context(), trigger)
        .expect("request fixture should build")
}
