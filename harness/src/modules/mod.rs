//! Ansible module contract
//!
//! Each module reads a JSON args file, does its work on the local host and
//! prints exactly one JSON object on stdout. Logs go to stderr so they never
//! corrupt the result.

pub mod args;
pub mod link;
pub mod scenarios;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::errors::HarnessError;
use crate::filesys::file::File;
use crate::host::HostEnvironment;
use crate::platform::PlatformIdentity;

use args::{BuildPluginArgs, FixedTestArgs, PluginTestArgs};

/// Modules this binary answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleName {
    IrodsBuildPlugin,
    IrodsTestPlugin,
    IrodsTestAuthKerberos,
    IrodsTestAuthGsi,
    IrodsTestResourceHpss,
    IrodsTestResourceWos,
    IrodsTestMicroserviceCurl,
}

impl ModuleName {
    pub const ALL: [ModuleName; 7] = [
        ModuleName::IrodsBuildPlugin,
        ModuleName::IrodsTestPlugin,
        ModuleName::IrodsTestAuthKerberos,
        ModuleName::IrodsTestAuthGsi,
        ModuleName::IrodsTestResourceHpss,
        ModuleName::IrodsTestResourceWos,
        ModuleName::IrodsTestMicroserviceCurl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleName::IrodsBuildPlugin => "irods_build_plugin",
            ModuleName::IrodsTestPlugin => "irods_test_plugin",
            ModuleName::IrodsTestAuthKerberos => "irods_test_auth_kerberos",
            ModuleName::IrodsTestAuthGsi => "irods_test_auth_gsi",
            ModuleName::IrodsTestResourceHpss => "irods_test_resource_hpss",
            ModuleName::IrodsTestResourceWos => "irods_test_resource_wos",
            ModuleName::IrodsTestMicroserviceCurl => "irods_test_microservice_curl",
        }
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleName {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| HarnessError::InvalidArguments(format!("unknown module '{}'", s)))
    }
}

/// The single JSON object a module prints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex_args: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Exit code of the failing command or test harness
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rc: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_platform_string: Option<String>,
}

impl ModuleResult {
    pub fn changed(complex_args: Value) -> Self {
        Self {
            changed: true,
            complex_args: Some(complex_args),
            failed: false,
            msg: None,
            rc: None,
            irods_platform_string: None,
        }
    }

    pub fn failed(name: ModuleName, error: &HarnessError) -> Self {
        let msg = match error {
            HarnessError::UnsupportedPlatform(_) => format!("{} module {}", name, error),
            other => other.to_string(),
        };
        Self {
            changed: false,
            complex_args: None,
            failed: true,
            msg: Some(msg),
            rc: Some(error.exit_code()),
            irods_platform_string: None,
        }
    }

    /// Process exit status matching this result
    pub fn exit_code(&self) -> i32 {
        if self.failed {
            self.rc.unwrap_or(1)
        } else {
            0
        }
    }
}

/// Run `name` with already-decoded arguments
pub async fn run(
    host: &dyn HostEnvironment,
    name: ModuleName,
    raw_args: &Value,
) -> Result<ModuleResult, HarnessError> {
    let identity = PlatformIdentity::detect(host).await;
    info!(
        "Running {} on {} ({})",
        name,
        identity.platform_string(),
        identity.platform
    );

    match name {
        ModuleName::IrodsBuildPlugin => {
            let args: BuildPluginArgs = args::parse(raw_args)?;
            let report = scenarios::build_plugin(host, &identity, &args).await?;
            let mut result = ModuleResult::changed(serde_json::to_value(&args)?);
            result.irods_platform_string = Some(report.irods_platform_string);
            Ok(result)
        }
        ModuleName::IrodsTestPlugin
        | ModuleName::IrodsTestAuthKerberos
        | ModuleName::IrodsTestAuthGsi
        | ModuleName::IrodsTestResourceHpss => {
            let args: PluginTestArgs = args::parse(raw_args)?;
            match name {
                ModuleName::IrodsTestAuthKerberos => {
                    scenarios::test_auth_kerberos(host, &identity, &args).await?
                }
                ModuleName::IrodsTestAuthGsi => {
                    scenarios::test_auth_gsi(host, &identity, &args).await?
                }
                ModuleName::IrodsTestResourceHpss => {
                    scenarios::test_resource_hpss(host, &identity, &args).await?
                }
                _ => scenarios::test_plugin(host, &identity, &args).await?,
            }
            Ok(ModuleResult::changed(serde_json::to_value(&args)?))
        }
        ModuleName::IrodsTestResourceWos | ModuleName::IrodsTestMicroserviceCurl => {
            let args: FixedTestArgs = args::parse(raw_args)?;
            if name == ModuleName::IrodsTestResourceWos {
                scenarios::test_resource_wos(host, &identity, &args).await?;
            } else {
                scenarios::test_microservice_curl(host, &identity, &args).await?;
            }
            Ok(ModuleResult::changed(serde_json::to_value(&args)?))
        }
    }
}

/// Entry point of module mode: read the args file, run, and always produce a result
pub async fn run_from_file(
    host: &dyn HostEnvironment,
    name: ModuleName,
    args_file: &Path,
) -> ModuleResult {
    let outcome = match File::new(args_file).read_json::<Value>().await {
        Ok(raw_args) => run(host, name, &raw_args).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(result) => {
            info!("{} finished", name);
            result
        }
        Err(e) => {
            error!("{} failed: {}", name, e);
            ModuleResult::failed(name, &e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_module_names_round_trip() {
        for name in ModuleName::ALL {
            assert_eq!(name.as_str().parse::<ModuleName>().unwrap(), name);
        }
        assert!("irods_test_everything".parse::<ModuleName>().is_err());
    }

    #[test]
    fn test_success_result_shape() {
        let args = json!({"package_prefix": "irods-resource-plugin-wos"});
        let mut result = ModuleResult::changed(args);
        result.irods_platform_string = Some("Ubuntu_14".to_string());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "changed": true,
                "complex_args": {"package_prefix": "irods-resource-plugin-wos"},
                "irods_platform_string": "Ubuntu_14",
            })
        );
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn test_failure_result_shape() {
        let error = HarnessError::UnsupportedPlatform("Linux (Opensuse)".to_string());
        let result = ModuleResult::failed(ModuleName::IrodsTestAuthKerberos, &error);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "changed": false,
                "failed": true,
                "msg": "irods_test_auth_kerberos module cannot be used on platform Linux (Opensuse)",
                "rc": 1,
            })
        );

        let harness = HarnessError::TestHarness {
            module: "test_wos".to_string(),
            code: 4,
        };
        let result = ModuleResult::failed(ModuleName::IrodsTestResourceWos, &harness);
        assert_eq!(result.exit_code(), 4);
    }

    #[test]
    fn test_signalled_harness_reports_one() {
        // A test process killed by a signal has no positive exit status
        let harness = HarnessError::TestHarness {
            module: "test_wos".to_string(),
            code: -1,
        };
        assert_eq!(harness.exit_code(), 1);
        let result = ModuleResult::failed(ModuleName::IrodsTestResourceWos, &harness);
        assert_eq!(result.rc, Some(1));
        assert_eq!(result.exit_code(), 1);
    }
}
