//! One function per module: prepare the host, then build or test

use std::path::PathBuf;

use tracing::info;

use crate::builder::{self, BuildJob, BuildReport};
use crate::configure::kerberos::KerberosSetup;
use crate::configure::{curl, gsi, hpss, wos};
use crate::errors::HarnessError;
use crate::host::{CommandSpec, HostEnvironment};
use crate::modules::args::{BuildPluginArgs, FixedTestArgs, PluginTestArgs};
use crate::platform::{PlatformIdentity, Strategy};
use crate::testing::{self, IrodsVersion, TestInvocation};

/// Where pre-4.2 servers keep harness output of the generic plugin tests
pub const LEGACY_TEST_OUTPUT: &str = "/var/lib/irods/tests/pydevtest/test_output.txt";

impl From<&PluginTestArgs> for TestInvocation {
    fn from(args: &PluginTestArgs) -> Self {
        TestInvocation {
            plugin_package_root: args.plugin_package_root_directory.clone(),
            plugin_package_prefix: args.plugin_package_prefix.clone(),
            test_module: args.python_test_module_to_run.clone(),
        }
    }
}

/// Build and package a plugin from source
pub async fn build_plugin(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    args: &BuildPluginArgs,
) -> Result<BuildReport, HarnessError> {
    let strategy = identity.strategy()?;
    let job = BuildJob {
        git_repository: args.git_repository.clone(),
        git_commitish: args.git_commitish.clone(),
        work_dir: builder::default_work_dir(&host.home_dir()),
        output_root: args.output_root_directory.clone(),
        irods_packages_root: args.irods_packages_root_directory.clone(),
        debug_build: args.debug_build,
    };
    builder::build(host, identity, strategy, &job).await
}

/// Install a prebuilt plugin and run one of its test modules
pub async fn test_plugin(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    args: &PluginTestArgs,
) -> Result<(), HarnessError> {
    let strategy = identity.strategy()?;
    let version = IrodsVersion::detect(host).await?;

    testing::install_plugin_package(host, identity, strategy, &args.into()).await?;
    host.run_command(&CommandSpec::sudo(["-E", "pip2", "install", "--upgrade", "boto3"]))
        .await?;

    let output_file = (!version.has_scripts_layout()).then_some(LEGACY_TEST_OUTPUT);
    testing::run_test_module(host, version, &args.python_test_module_to_run, output_file).await
}

/// Stand up a Kerberos realm, then test the Kerberos authentication plugin
pub async fn test_auth_kerberos(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    args: &PluginTestArgs,
) -> Result<(), HarnessError> {
    let version = IrodsVersion::detect(host).await?;
    let mut setup = KerberosSetup::new(host, identity, version)?;
    let strategy = identity.strategy()?;

    setup.run().await?;
    testing::install_plugin_package(host, identity, strategy, &args.into()).await?;
    testing::run_test_module(host, version, &args.python_test_module_to_run, None).await
}

/// Install Globus and issue certificates, then test the GSI authentication plugin
pub async fn test_auth_gsi(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    args: &PluginTestArgs,
) -> Result<(), HarnessError> {
    let strategy = gsi::supported_strategy(identity)?;
    let version = IrodsVersion::detect(host).await?;

    gsi::install_globus(host, identity, strategy).await?;
    testing::install_plugin_package(host, identity, strategy, &args.into()).await?;
    gsi::configure_globus(host).await?;
    testing::run_test_module(host, version, &args.python_test_module_to_run, None).await
}

/// Start HPSS and register the service account, then test the HPSS resource plugin
pub async fn test_resource_hpss(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    args: &PluginTestArgs,
) -> Result<(), HarnessError> {
    let version = IrodsVersion::detect(host).await?;
    let package = testing::find_plugin_package(
        host,
        &args.plugin_package_root_directory,
        &identity.platform_string(),
        &args.plugin_package_prefix,
    )
    .await?;
    info!("Installing HPSS plugin package {:?}", package);
    host.run_command(&hpss::plugin_install_command(&package)).await?;

    hpss::configure_hpss(host).await?;
    testing::run_test_module(host, version, &args.python_test_module_to_run, None).await
}

/// Test the WOS resource plugin
pub async fn test_resource_wos(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    args: &FixedTestArgs,
) -> Result<(), HarnessError> {
    let strategy = identity.strategy()?;
    let version = IrodsVersion::detect(host).await?;

    wos::install_dependencies(host, strategy).await?;
    install_dashed_package(host, identity, strategy, args).await?;
    testing::run_test_module(host, version, wos::TEST_MODULE, None).await
}

/// Test the curl microservice plugin
pub async fn test_microservice_curl(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    args: &FixedTestArgs,
) -> Result<(), HarnessError> {
    let strategy = identity.strategy()?;
    let version = IrodsVersion::detect(host).await?;

    install_dashed_package(host, identity, strategy, args).await?;
    testing::run_test_module(host, version, curl::TEST_MODULE, None).await
}

async fn install_dashed_package(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    strategy: Strategy,
    args: &FixedTestArgs,
) -> Result<PathBuf, HarnessError> {
    let invocation = TestInvocation {
        plugin_package_root: args.plugin_root_directory.clone(),
        plugin_package_prefix: testing::dashed_prefix(&args.package_prefix),
        test_module: String::new(),
    };
    testing::install_plugin_package(host, identity, strategy, &invocation).await
}
