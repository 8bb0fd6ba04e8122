//! Script identity and host compatibility.

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

/// Major version of the host contract. Scripts must declare exactly this
/// value to be loaded.
pub const HOST_MAJOR_VERSION: &str = "5";

/// Declarative identity of a script, resolved once at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptManifest {
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Run once at host startup instead of per trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_only: Option<bool>,
    /// Host major version the script targets. The wire key is kept for
    /// compatibility with existing script packages.
    #[serde(rename = "firebotVersion", skip_serializing_if = "Option::is_none")]
    pub firebot_version: Option<String>,
}

impl ScriptManifest {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: version.into(),
            author: author.into(),
            website: None,
            startup_only: None,
            firebot_version: Some(HOST_MAJOR_VERSION.to_owned()),
        }
    }

    /// Reject load unless the declared compatibility tag matches the host's
    /// major version. An absent tag is a mismatch.
    pub fn check_compatibility(&self, host_major: &str) -> Result<(), ScriptError> {
        match self.firebot_version.as_deref() {
            Some(declared) if declared == host_major => Ok(()),
            declared => Err(ScriptError::ManifestIncompatible {
                declared: declared.map(str::to_owned),
                accepted: host_major.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn current_major_version_is_accepted() {
        let manifest = ScriptManifest::new("Greeter", "Says hi", "1.0.0", "ember");
        manifest.check_compatibility(HOST_MAJOR_VERSION).unwrap();
    }

    #[test]
    fn other_versions_and_absence_are_rejected() {
        let mut manifest = ScriptManifest::new("Greeter", "Says hi", "1.0.0", "ember");

        manifest.firebot_version = Some("4".to_owned());
        let err = manifest.check_compatibility(HOST_MAJOR_VERSION).unwrap_err();
        assert_eq!(
            err,
            ScriptError::ManifestIncompatible {
                declared: Some("4".to_owned()),
                accepted: HOST_MAJOR_VERSION.to_owned(),
            }
        );

        manifest.firebot_version = None;
        assert!(manifest.check_compatibility(HOST_MAJOR_VERSION).is_err());
    }

    #[test]
    fn manifest_round_trips_with_wire_keys() {
        let mut manifest = ScriptManifest::new("Greeter", "Says hi", "1.0.0", "ember");
        manifest.startup_only = Some(true);
        manifest.website = Some("https://example.com".to_owned());

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            json,
            json!({
                "name": "Greeter",
                "description": "Says hi",
                "version": "1.0.0",
                "author": "ember",
                "website": "https://example.com",
                "startupOnly": true,
                "firebotVersion": "5",
            })
        );

        let back: ScriptManifest = serde_json::from_value(json).unwrap();
        assert_eq!(back, manifest);
    }
}
