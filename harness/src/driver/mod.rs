//! Orchestration of one remote test run
//!
//! Deploys a zone bundle, runs one module on its iCAT server and then, no
//! matter how the module run ended (including an interrupting signal),
//! gathers logs and destroys the deployment.

pub mod zone_bundle;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::errors::HarnessError;
use crate::host::HostEnvironment;
use crate::modules::ModuleName;

pub use zone_bundle::{CommandZoneBundle, DeployRequest, RemoteTask, ZoneBundle};

/// Written into the output directory by the deploy step
pub const DEPLOYED_ZONE_FILE: &str = "deployed_zone.json";

/// Everything `plugtest drive` is told on its command line
#[derive(Debug, Clone)]
pub struct DriveOptions {
    pub zone_bundle_input: PathBuf,
    pub deployment_name: String,
    pub irods_core_packages_root_directory: PathBuf,
    pub plugin_package_root_directory: PathBuf,
    pub plugin_package_prefix: String,
    pub ansible_module_to_run: String,
    pub python_test_module_to_run: String,
    pub output_directory: PathBuf,
    /// Key under which the core packages are offered to the deployment
    pub version_key: String,
}

impl DriveOptions {
    pub fn deployed_zone_file(&self) -> PathBuf {
        self.output_directory.join(DEPLOYED_ZONE_FILE)
    }

    /// Arguments for the remote module
    pub fn complex_args(&self) -> Value {
        let fixed_test_module = matches!(
            self.ansible_module_to_run.parse::<ModuleName>(),
            Ok(ModuleName::IrodsTestResourceWos | ModuleName::IrodsTestMicroserviceCurl)
        );
        if fixed_test_module {
            json!({
                "plugin_root_directory": self.plugin_package_root_directory,
                "package_prefix": self.plugin_package_prefix,
                "output_directory": self.output_directory,
            })
        } else {
            json!({
                "plugin_package_root_directory": self.plugin_package_root_directory,
                "plugin_package_prefix": self.plugin_package_prefix,
                "python_test_module_to_run": self.python_test_module_to_run,
                "output_directory": self.output_directory,
            })
        }
    }
}

/// How each phase of a run ended
#[derive(Debug)]
pub struct DriveOutcome {
    pub task: Result<(), HarnessError>,
    pub gather: Result<(), HarnessError>,
    pub destroy: Result<(), HarnessError>,
}

impl DriveOutcome {
    /// Succeeds only when the module run and the log gathering both did
    pub fn is_success(&self) -> bool {
        self.task.is_ok() && self.gather.is_ok()
    }

    pub fn exit_code(&self) -> i32 {
        match (&self.task, &self.gather) {
            (Ok(()), Ok(())) => 0,
            (Err(e), _) | (Ok(()), Err(e)) => e.exit_code(),
        }
    }
}

/// IP address of the first zone's iCAT server
pub fn icat_ip(deployed: &Value) -> Result<String, HarnessError> {
    deployed
        .pointer("/zones/0/icat_server/deployment_information/ip_address")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            HarnessError::ZoneBundle(
                "deployed zone bundle has no iCAT server ip_address".to_string(),
            )
        })
}

/// Run the whole deploy, test, gather, destroy sequence.
///
/// Errors before the deployment exists are returned directly; once it
/// exists, every phase is recorded in the [`DriveOutcome`] and the cleanup
/// phases always run. `shutdown` resolving aborts the module run only.
pub async fn drive<F>(
    host: &dyn HostEnvironment,
    bundle: &dyn ZoneBundle,
    options: &DriveOptions,
    shutdown: F,
) -> Result<DriveOutcome, HarnessError>
where
    F: Future<Output = ()> + Send,
{
    let input = host.read_file(&options.zone_bundle_input).await?;
    serde_json::from_str::<Value>(&input).map_err(|source| HarnessError::ConfigParse {
        path: options.zone_bundle_input.clone(),
        source,
    })?;
    host.create_dir(&options.output_directory).await?;

    let request = DeployRequest {
        zone_bundle_input: options.zone_bundle_input.clone(),
        deployment_name: options.deployment_name.clone(),
        version_to_packages: BTreeMap::from([(
            options.version_key.clone(),
            options.irods_core_packages_root_directory.clone(),
        )]),
        output_file: options.deployed_zone_file(),
    };
    let deployed = bundle.deploy(&request).await?;
    let deployed_file = options.deployed_zone_file();
    info!("Deployment recorded in {:?}", deployed_file);

    let task = tokio::select! {
        result = run_task(bundle, options, &deployed) => result,
        _ = shutdown => {
            warn!("Interrupted; cleaning up the deployment");
            Err(HarnessError::ZoneBundle("interrupted by signal".to_string()))
        }
    };
    if let Err(e) = &task {
        error!("Remote task failed: {}", e);
    }

    let gather = bundle.gather(&deployed_file, &options.output_directory).await;
    if let Err(e) = &gather {
        error!("Gathering logs failed: {}", e);
    }

    let destroy = bundle.destroy(&deployed_file).await;
    if let Err(e) = &destroy {
        error!("Destroying the deployment failed: {}", e);
    }

    Ok(DriveOutcome { task, gather, destroy })
}

async fn run_task(
    bundle: &dyn ZoneBundle,
    options: &DriveOptions,
    deployed: &Value,
) -> Result<(), HarnessError> {
    let task = RemoteTask {
        module_name: options.ansible_module_to_run.clone(),
        complex_args: options.complex_args(),
        hosts: vec![icat_ip(deployed)?],
    };
    bundle.run_ansible(&task).await
}

/// Default module link directory for a run
pub fn default_modules_dir(output_directory: &Path) -> PathBuf {
    output_directory.join("modules")
}
