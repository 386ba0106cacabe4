//! Git checkout of the plugin source

use std::path::Path;

use tracing::{debug, info};

use crate::errors::HarnessError;
use crate::host::{CommandSpec, HostEnvironment};

/// Clone `repo_url` recursively into `target_dir` and check out `commitish`.
///
/// The target must not exist; a checkout is never reused between builds.
pub async fn prepare_repository(
    host: &dyn HostEnvironment,
    repo_url: &str,
    commitish: &str,
    target_dir: &Path,
) -> Result<(), HarnessError> {
    info!(
        "Preparing Git repository: {} ({}) in {:?}",
        repo_url, commitish, target_dir
    );

    if host.exists(target_dir).await {
        return Err(HarnessError::InvalidArguments(format!(
            "Build directory {} already exists",
            target_dir.display()
        )));
    }

    debug!("Cloning repository to {:?}...", target_dir);
    host.run_command(
        &CommandSpec::new("git")
            .args(["clone", "--recursive", repo_url])
            .arg(target_dir.to_string_lossy()),
    )
    .await?;

    debug!("Checking out {}...", commitish);
    host.run_command(
        &CommandSpec::new("git")
            .args(["checkout", commitish])
            .current_dir(target_dir),
    )
    .await?;

    info!("Repository ready at {:?}", target_dir);
    Ok(())
}
