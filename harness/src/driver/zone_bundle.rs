//! The external zone-bundle tool
//!
//! Deploying, gathering and destroying are delegated to a separate program;
//! remote module runs go through `ansible`. Both are reached through the
//! host so the driver can be exercised against a [`FakeHost`].
//!
//! [`FakeHost`]: crate::host::fake::FakeHost

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::errors::HarnessError;
use crate::host::{CommandSpec, HostEnvironment};
use crate::settings::{AnsibleSettings, ZoneBundleSettings};

/// What to deploy and where to record the result
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub zone_bundle_input: PathBuf,
    pub deployment_name: String,
    /// iRODS version key to core packages directory
    pub version_to_packages: BTreeMap<String, PathBuf>,
    /// Receives the deployed zone bundle
    pub output_file: PathBuf,
}

/// One remote module run
#[derive(Debug, Clone)]
pub struct RemoteTask {
    pub module_name: String,
    pub complex_args: Value,
    pub hosts: Vec<String>,
}

/// Lifecycle of a deployed zone
#[async_trait]
pub trait ZoneBundle: Send + Sync {
    /// Deploy the zone and return the deployed zone bundle
    async fn deploy(&self, request: &DeployRequest) -> Result<Value, HarnessError>;

    /// Run one module on the given hosts
    async fn run_ansible(&self, task: &RemoteTask) -> Result<(), HarnessError>;

    /// Copy logs from every deployed host into `output_directory`
    async fn gather(&self, deployed: &Path, output_directory: &Path) -> Result<(), HarnessError>;

    /// Tear the deployment down
    async fn destroy(&self, deployed: &Path) -> Result<(), HarnessError>;
}

/// [`ZoneBundle`] backed by the zone-bundle tool and `ansible` commands
pub struct CommandZoneBundle<'a> {
    host: &'a dyn HostEnvironment,
    zone_bundle: ZoneBundleSettings,
    ansible: AnsibleSettings,
    modules_dir: PathBuf,
}

impl<'a> CommandZoneBundle<'a> {
    pub fn new(
        host: &'a dyn HostEnvironment,
        zone_bundle: ZoneBundleSettings,
        ansible: AnsibleSettings,
        modules_dir: PathBuf,
    ) -> Self {
        Self {
            host,
            zone_bundle,
            ansible,
            modules_dir,
        }
    }

    fn tool(&self, subcommand: &str) -> CommandSpec {
        CommandSpec::new(&self.zone_bundle.program)
            .args(self.zone_bundle.base_args.iter().cloned())
            .arg(subcommand)
    }

    /// The ad-hoc `ansible` invocation for `task`
    pub fn ansible_command(&self, task: &RemoteTask) -> Result<CommandSpec, HarnessError> {
        // the trailing comma makes ansible read the list inline
        let inventory = format!("{},", task.hosts.join(","));
        let mut command = CommandSpec::new(&self.ansible.program)
            .args(["all", "-i"])
            .arg(inventory)
            .args(["-u", self.ansible.remote_user.as_str()]);
        if self.ansible.become_root {
            command = command.arg("--become");
        }
        Ok(command
            .arg("-M")
            .arg(self.modules_dir.to_string_lossy())
            .args(["-m", task.module_name.as_str(), "-a"])
            .arg(serde_json::to_string(&task.complex_args)?))
    }
}

fn zone_bundle_error(step: &str, error: HarnessError) -> HarnessError {
    HarnessError::ZoneBundle(format!("{} failed: {}", step, error))
}

#[async_trait]
impl ZoneBundle for CommandZoneBundle<'_> {
    async fn deploy(&self, request: &DeployRequest) -> Result<Value, HarnessError> {
        info!("Deploying {} from {:?}", request.deployment_name, request.zone_bundle_input);
        let command = self
            .tool("deploy")
            .arg("--zone-bundle-input")
            .arg(request.zone_bundle_input.to_string_lossy())
            .args(["--deployment-name", request.deployment_name.as_str()])
            .arg("--version-to-packages-map")
            .arg(serde_json::to_string(&request.version_to_packages)?)
            .arg("--output")
            .arg(request.output_file.to_string_lossy());
        self.host
            .run_command(&command)
            .await
            .map_err(|e| zone_bundle_error("deploy", e))?;

        let text = self.host.read_file(&request.output_file).await?;
        serde_json::from_str(&text).map_err(|source| HarnessError::ConfigParse {
            path: request.output_file.clone(),
            source,
        })
    }

    async fn run_ansible(&self, task: &RemoteTask) -> Result<(), HarnessError> {
        info!("Running module {} on {:?}", task.module_name, task.hosts);
        let command = self.ansible_command(task)?;
        self.host.run_command(&command).await?;
        Ok(())
    }

    async fn gather(&self, deployed: &Path, output_directory: &Path) -> Result<(), HarnessError> {
        let command = self
            .tool("gather")
            .arg("--deployed-zone-bundle")
            .arg(deployed.to_string_lossy())
            .arg("--output-directory")
            .arg(output_directory.to_string_lossy());
        self.host
            .run_command(&command)
            .await
            .map_err(|e| zone_bundle_error("gather", e))?;
        Ok(())
    }

    async fn destroy(&self, deployed: &Path) -> Result<(), HarnessError> {
        let command = self
            .tool("destroy")
            .arg("--deployed-zone-bundle")
            .arg(deployed.to_string_lossy());
        self.host
            .run_command(&command)
            .await
            .map_err(|e| zone_bundle_error("destroy", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;
    use serde_json::json;

    #[test]
    fn test_ansible_command() {
        let host = FakeHost::new();
        let bundle = CommandZoneBundle::new(
            &host,
            ZoneBundleSettings::default(),
            AnsibleSettings::default(),
            PathBuf::from("/out/modules"),
        );
        let task = RemoteTask {
            module_name: "irods_test_auth_kerberos".to_string(),
            complex_args: json!({"plugin_package_prefix": "irods-auth-krb"}),
            hosts: vec!["10.0.0.5".to_string()],
        };
        assert_eq!(
            bundle.ansible_command(&task).unwrap().to_string(),
            "ansible all -i 10.0.0.5, -u irodsbuild --become -M /out/modules -m irods_test_auth_kerberos -a '{\"plugin_package_prefix\":\"irods-auth-krb\"}'"
        );
    }

    #[tokio::test]
    async fn test_deploy_reads_output() {
        let host = FakeHost::new().with_file("/out/deployed_zone.json", r#"{"zones": []}"#);
        let bundle = CommandZoneBundle::new(
            &host,
            ZoneBundleSettings::default(),
            AnsibleSettings::default(),
            PathBuf::from("/out/modules"),
        );
        let request = DeployRequest {
            zone_bundle_input: PathBuf::from("/in/zone.json"),
            deployment_name: "krb-test".to_string(),
            version_to_packages: BTreeMap::from([(
                "deployment-determined".to_string(),
                PathBuf::from("/irods"),
            )]),
            output_file: PathBuf::from("/out/deployed_zone.json"),
        };

        let deployed = bundle.deploy(&request).await.unwrap();
        assert_eq!(deployed, json!({"zones": []}));
        assert_eq!(
            host.command_lines()[0],
            "irods_testing_zone_bundle deploy --zone-bundle-input /in/zone.json --deployment-name krb-test --version-to-packages-map '{\"deployment-determined\":\"/irods\"}' --output /out/deployed_zone.json"
        );
    }
}
