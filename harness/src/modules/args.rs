//! Typed module arguments
//!
//! Ansible adds its own `_ansible_*` keys to every args file; unknown keys
//! are ignored. Only the declared keys are echoed back as `complex_args`.

use std::path::PathBuf;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::HarnessError;

/// `irods_build_plugin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPluginArgs {
    pub output_root_directory: PathBuf,
    pub irods_packages_root_directory: PathBuf,
    pub git_repository: String,
    pub git_commitish: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub debug_build: bool,
}

/// `irods_test_plugin`, `irods_test_auth_kerberos`, `irods_test_auth_gsi`
/// and `irods_test_resource_hpss`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginTestArgs {
    pub plugin_package_root_directory: PathBuf,
    pub plugin_package_prefix: String,
    pub python_test_module_to_run: String,
    pub output_directory: PathBuf,
}

/// `irods_test_resource_wos` and `irods_test_microservice_curl`; the test
/// module is fixed per plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedTestArgs {
    pub plugin_root_directory: PathBuf,
    pub package_prefix: String,
    pub output_directory: PathBuf,
}

/// Decode module arguments, reporting missing or mistyped keys
pub fn parse<T: DeserializeOwned>(args: &Value) -> Result<T, HarnessError> {
    T::deserialize(args).map_err(|e| HarnessError::InvalidArguments(e.to_string()))
}

/// Ansible may hand booleans over as strings ("yes", "True", "1")
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Int(i) => Ok(i != 0),
        Raw::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" | "y" => Ok(true),
            "false" | "no" | "off" | "0" | "n" => Ok(false),
            other => Err(de::Error::custom(format!("not a boolean: {:?}", other))),
        },
    }
}
