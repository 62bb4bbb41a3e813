//! # Extension Registry Records
//!
//! Shape of one entry in an editor profile's `extensions.json`.
//!
//! The format is owned by the editor and undocumented; these structs mirror what recent
//! VS Code-family releases write. Only records we create are typed. Records already in
//! the file are handled as raw `serde_json::Value`s so fields we do not model survive a
//! rewrite untouched.
//!
//! ```json
//! {
//!   "identifier": { "id": "esbenp.prettier-vscode" },
//!   "version": "11.0.0",
//!   "location": { "$mid": 1, "fsPath": "/home/me/.config/Code/User/profiles/ab12/extensions/esbenp.prettier-vscode-11.0.0",
//!                 "path": "/home/me/...", "scheme": "file" },
//!   "relativeLocation": "esbenp.prettier-vscode-11.0.0",
//!   "metadata": { "installedTimestamp": 1760870400000, "source": "vsix", "targetPlatform": "universal" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Platform recorded for packages that run everywhere.
pub const UNIVERSAL_PLATFORM: &str = "universal";

/// Editor release line the record layout was observed against.
pub const OBSERVED_SCHEMA: &str = "VS Code 1.9x extensions.json (profiles, location $mid=1)";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtensionIdentifier {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordLocation {
    #[serde(rename = "$mid")]
    pub mid: u32,
    pub fs_path: String,
    pub path: String,
    pub scheme: String,
}

impl RecordLocation {
    pub fn for_path(path: &Path) -> Self {
        let fs_path = path.to_string_lossy().to_string();
        // URI paths always use forward slashes, even on Windows.
        let uri_path = if fs_path.starts_with('/') {
            fs_path.replace('\\', "/")
        } else {
            format!("/{}", fs_path.replace('\\', "/"))
        };
        RecordLocation {
            mid: 1,
            fs_path,
            path: uri_path,
            scheme: "file".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub installed_timestamp: i64,
    pub source: String,
    pub target_platform: String,
    pub is_application_scoped: bool,
    pub is_machine_scoped: bool,
    pub is_builtin: bool,
    pub pinned: bool,
    pub updated: bool,
    pub pre_release_version: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRecord {
    pub identifier: ExtensionIdentifier,
    pub version: String,
    pub location: RecordLocation,
    pub relative_location: String,
    pub metadata: RecordMetadata,
}

impl ExtensionRecord {
    /// Builds the record for a package directory freshly copied into a profile.
    pub fn new(
        identifier: &str,
        version: &str,
        target_platform: &str,
        package_dir: &Path,
        installed_timestamp: i64,
    ) -> Self {
        let relative_location = package_dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{identifier}-{version}"));

        ExtensionRecord {
            identifier: ExtensionIdentifier {
                id: identifier.to_lowercase(),
            },
            version: version.to_string(),
            location: RecordLocation::for_path(package_dir),
            relative_location,
            metadata: RecordMetadata {
                installed_timestamp,
                source: "vsix".to_string(),
                target_platform: target_platform.to_string(),
                is_application_scoped: false,
                is_machine_scoped: false,
                is_builtin: false,
                pinned: true,
                updated: true,
                pre_release_version: false,
            },
        }
    }
}

/// Reads `identifier.id` from a raw registry entry.
pub fn record_id(record: &serde_json::Value) -> Option<&str> {
    record.get("identifier")?.get("id")?.as_str()
}

/// Reads `metadata.targetPlatform` from a raw registry entry.
pub fn record_target_platform(record: &serde_json::Value) -> Option<&str> {
    record.get("metadata")?.get("targetPlatform")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_record_serializes_with_editor_field_names() {
        let record = ExtensionRecord::new(
            "Esbenp.Prettier-VSCode",
            "11.0.0",
            "linux-x64",
            Path::new("/home/me/profiles/ab12/extensions/esbenp.prettier-vscode-11.0.0"),
            1_760_870_400_000,
        );
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["identifier"]["id"], "esbenp.prettier-vscode");
        assert_eq!(value["location"]["$mid"], 1);
        assert_eq!(
            value["location"]["fsPath"],
            "/home/me/profiles/ab12/extensions/esbenp.prettier-vscode-11.0.0"
        );
        assert_eq!(value["relativeLocation"], "esbenp.prettier-vscode-11.0.0");
        assert_eq!(value["metadata"]["installedTimestamp"], 1_760_870_400_000_i64);
        assert_eq!(value["metadata"]["source"], "vsix");
        assert_eq!(value["metadata"]["targetPlatform"], "linux-x64");
    }

    #[test]
    fn record_id_reads_nested_identifier() {
        let entry = json!({ "identifier": { "id": "a.b", "uuid": "x" }, "version": "1.0.0" });
        assert_eq!(record_id(&entry), Some("a.b"));
        assert_eq!(record_id(&json!({ "version": "1.0.0" })), None);
    }
}
