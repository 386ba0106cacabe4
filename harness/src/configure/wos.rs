//! WOS resource plugin test prerequisites

use tracing::info;

use crate::errors::HarnessError;
use crate::host::HostEnvironment;
use crate::platform::Strategy;

pub const TEST_MODULE: &str = "test_irods_resource_plugin_wos";

const DEPENDENCIES: &[&str] = &["git"];

/// Packages the WOS test suite needs besides the plugin
pub async fn install_dependencies(
    host: &dyn HostEnvironment,
    strategy: Strategy,
) -> Result<(), HarnessError> {
    let names: Vec<String> = DEPENDENCIES.iter().map(|s| s.to_string()).collect();
    host.install_packages(strategy, &names).await?;
    info!("WOS test dependencies installed");
    Ok(())
}
