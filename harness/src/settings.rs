//! Driver settings file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::HarnessError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// External zone-bundle tool
    #[serde(default)]
    pub zone_bundle: ZoneBundleSettings,

    /// Remote module execution
    #[serde(default)]
    pub ansible: AnsibleSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            zone_bundle: ZoneBundleSettings::default(),
            ansible: AnsibleSettings::default(),
        }
    }
}

impl Settings {
    /// Read `path`, or fall back to the defaults when no file is given
    pub async fn load(path: Option<&Path>) -> Result<Settings, HarnessError> {
        match path {
            Some(path) => File::new(path).read_json::<Settings>().await,
            None => Ok(Settings::default()),
        }
    }
}

/// Zone-bundle tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBundleSettings {
    /// Program implementing `deploy`, `gather` and `destroy`
    #[serde(default = "default_zone_bundle_program")]
    pub program: String,

    /// Arguments placed before the subcommand
    #[serde(default)]
    pub base_args: Vec<String>,

    /// Version key handed to `deploy` with the core packages directory
    #[serde(default = "default_version_key")]
    pub version_key: String,
}

fn default_zone_bundle_program() -> String {
    "irods_testing_zone_bundle".to_string()
}

fn default_version_key() -> String {
    "deployment-determined".to_string()
}

impl Default for ZoneBundleSettings {
    fn default() -> Self {
        Self {
            program: default_zone_bundle_program(),
            base_args: Vec::new(),
            version_key: default_version_key(),
        }
    }
}

/// Ansible settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnsibleSettings {
    /// The `ansible` ad-hoc command
    #[serde(default = "default_ansible_program")]
    pub program: String,

    /// Account used to reach the deployed hosts
    #[serde(default = "default_remote_user")]
    pub remote_user: String,

    /// Directory holding the module links; created next to the output when unset
    #[serde(default)]
    pub modules_dir: Option<PathBuf>,

    /// Run modules with `--become`
    #[serde(default = "default_true")]
    pub become_root: bool,
}

fn default_ansible_program() -> String {
    "ansible".to_string()
}

fn default_remote_user() -> String {
    "irodsbuild".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AnsibleSettings {
    fn default() -> Self {
        Self {
            program: default_ansible_program(),
            remote_user: default_remote_user(),
            modules_dir: None,
            become_root: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"ansible": {"remote_user": "centos"}}"#).unwrap();
        assert_eq!(settings.ansible.remote_user, "centos");
        assert_eq!(settings.ansible.program, "ansible");
        assert!(settings.ansible.become_root);
        assert_eq!(settings.zone_bundle, ZoneBundleSettings::default());
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[tokio::test]
    async fn test_load_without_file() {
        assert_eq!(Settings::load(None).await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_load_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Settings::load(Some(&path)).await.unwrap_err();
        assert!(matches!(err, HarnessError::ConfigParse { .. }));
    }
}
