//! Test invocation
//!
//! Installs a prebuilt plugin package and runs exactly one module of the
//! iRODS test harness as the service account.

pub mod version;

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::errors::HarnessError;
use crate::host::{CommandSpec, HostEnvironment};
use crate::platform::{PlatformIdentity, Strategy};
use crate::utils::{shell_quote, tail_lines};

pub use version::IrodsVersion;

/// OS account owning the iRODS service
pub const SERVICE_ACCOUNT: &str = "irods";

/// One plugin test run
#[derive(Debug, Clone)]
pub struct TestInvocation {
    /// Root holding one directory of packages per platform string
    pub plugin_package_root: PathBuf,
    /// Substring identifying the plugin package file
    pub plugin_package_prefix: String,
    /// Test module handed to `run_tests.py --run_specific_test`
    pub test_module: String,
}

/// First file, by name, under `<root>/<platform_string>` containing `prefix`
pub async fn find_plugin_package(
    host: &dyn HostEnvironment,
    root: &Path,
    platform_string: &str,
    prefix: &str,
) -> Result<PathBuf, HarnessError> {
    let directory = root.join(platform_string);
    let not_found = || HarnessError::PluginPackageNotFound {
        directory: directory.clone(),
        prefix: prefix.to_string(),
    };

    let names = host.list_dir(&directory).await.map_err(|_| not_found())?;
    names
        .into_iter()
        .find(|name| name.contains(prefix))
        .map(|name| directory.join(name))
        .ok_or_else(not_found)
}

/// `prefix` followed by exactly one dash, so a bare plugin name does not
/// match longer plugin names sharing it
pub fn dashed_prefix(prefix: &str) -> String {
    format!("{}-", prefix.trim_end_matches('-'))
}

/// Locate the plugin package for this platform and install it
pub async fn install_plugin_package(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    strategy: Strategy,
    invocation: &TestInvocation,
) -> Result<PathBuf, HarnessError> {
    let package = find_plugin_package(
        host,
        &invocation.plugin_package_root,
        &identity.platform_string(),
        &invocation.plugin_package_prefix,
    )
    .await?;
    info!("Installing plugin package {:?}", package);
    host.install_local_packages(strategy, std::slice::from_ref(&package))
        .await?;
    Ok(package)
}

/// The harness command for `module`, optionally redirecting its stdout to `output_file`
pub fn test_command(version: IrodsVersion, module: &str, output_file: Option<&str>) -> CommandSpec {
    let mut script = format!(
        "cd {}; python run_tests.py --xml_output --run_specific_test {}",
        version.tests_dir(),
        shell_quote(module)
    );
    if let Some(output_file) = output_file {
        script.push_str(&format!(" > {}", shell_quote(output_file)));
    }
    CommandSpec::as_user(SERVICE_ACCOUNT, script)
}

/// Run one test module; a failing harness exit code is forwarded in the error
pub async fn run_test_module(
    host: &dyn HostEnvironment,
    version: IrodsVersion,
    module: &str,
    output_file: Option<&str>,
) -> Result<(), HarnessError> {
    info!("Running test module {} (iRODS {})", module, version);
    let output = host.execute(&test_command(version, module, output_file)).await?;
    if output.is_success() {
        info!("Test module {} passed", module);
        return Ok(());
    }

    error!(
        "Test module {} failed with exit code {}:\n{}",
        module,
        output.code,
        tail_lines(&format!("{}\n{}", output.stdout, output.stderr), 40)
    );
    Err(HarnessError::TestHarness {
        module: module.to_string(),
        code: output.code,
    })
}

/// Restart the iRODS server through its control script
pub async fn restart_irods(
    host: &dyn HostEnvironment,
    version: IrodsVersion,
) -> Result<(), HarnessError> {
    let command = CommandSpec::new("su")
        .args(["-", SERVICE_ACCOUNT, "-c"])
        .arg(format!("{} restart", version.irodsctl()));
    host.run_command(&command).await?;
    Ok(())
}
