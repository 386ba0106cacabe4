//! Plugin source builds
//!
//! A build installs the platform's prerequisites, checks the plugin out at a
//! fixed revision, runs the project's own packaging script and copies the
//! resulting `build` tree to `<output_root>/<platform_string>`.

pub mod dependencies;
pub mod git;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::errors::HarnessError;
use crate::host::command::OUTPUT_TAIL_LINES;
use crate::host::{CommandSpec, HostEnvironment};
use crate::platform::{PlatformIdentity, Strategy};
use crate::utils::tail_lines;

/// Checkout directory, relative to the invoking user's home
pub const LOCAL_PLUGIN_DIR: &str = "irods_build_local_plugin_dir";

/// Build log, relative to the checkout
pub const BUILD_LOG: &str = "build/build_plugin_output.log";

/// One plugin build
#[derive(Debug, Clone)]
pub struct BuildJob {
    pub git_repository: String,
    pub git_commitish: String,
    /// Fresh checkout directory
    pub work_dir: PathBuf,
    /// Receives one directory of artifacts per platform string
    pub output_root: PathBuf,
    /// Holds the iRODS dev/runtime packages, one directory per platform string
    pub irods_packages_root: PathBuf,
    pub debug_build: bool,
}

/// Where a finished build put its artifacts
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub irods_platform_string: String,
    pub output_directory: PathBuf,
}

impl BuildJob {
    pub fn build_dir(&self) -> PathBuf {
        self.work_dir.join("build")
    }

    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(BUILD_LOG)
    }

    /// The packaging script invocation; its exit code, not the pipe's, decides success
    pub fn build_command(&self) -> CommandSpec {
        let flags = if self.debug_build { "" } else { " -r" };
        let script = format!(
            "./packaging/build.sh{} 2>&1 | tee ./{}; exit $PIPESTATUS",
            flags, BUILD_LOG
        );
        CommandSpec::sudo(["su", "-c"])
            .arg(script)
            .current_dir(&self.work_dir)
    }
}

/// Run the whole build protocol; every step is fatal
pub async fn build(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    strategy: Strategy,
    job: &BuildJob,
) -> Result<BuildReport, HarnessError> {
    let packages_root = &job.irods_packages_root;
    dependencies::install_building_dependencies(host, identity, strategy, packages_root).await?;

    git::prepare_repository(host, &job.git_repository, &job.git_commitish, &job.work_dir)
        .await?;

    host.create_dir(&job.build_dir()).await?;
    run_build_script(host, job).await?;

    let output_directory = job.output_root.join(identity.platform_string());
    info!("Copying build output to {:?}", output_directory);
    host.copy_tree(&job.build_dir(), &output_directory).await?;

    Ok(BuildReport {
        irods_platform_string: identity.platform_string(),
        output_directory,
    })
}

async fn run_build_script(
    host: &dyn HostEnvironment,
    job: &BuildJob,
) -> Result<(), HarnessError> {
    info!("Building plugin in {:?}", job.work_dir);
    let command = job.build_command();
    let output = host.execute(&command).await?;
    if output.is_success() {
        return Ok(());
    }

    let log_tail = match host.read_file(&job.log_path()).await {
        Ok(log) => tail_lines(&log, OUTPUT_TAIL_LINES),
        Err(_) => tail_lines(&output.stdout, OUTPUT_TAIL_LINES),
    };
    error!("Plugin build failed with exit code {}", output.code);
    Err(HarnessError::CommandExecution {
        command: command.to_string(),
        code: output.code,
        output_tail: log_tail,
    })
}

/// Default checkout location under `home`
pub fn default_work_dir(home: &Path) -> PathBuf {
    home.join(LOCAL_PLUGIN_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;
    use crate::host::CommandOutput;

    fn job(debug_build: bool) -> BuildJob {
        BuildJob {
            git_repository: "https://github.com/irods/irods_auth_plugin_krb".to_string(),
            git_commitish: "4-2-stable".to_string(),
            work_dir: PathBuf::from("/home/irodsbuild/irods_build_local_plugin_dir"),
            output_root: PathBuf::from("/out"),
            irods_packages_root: PathBuf::from("/irods_pkgs"),
            debug_build,
        }
    }

    #[test]
    fn test_build_command_release_and_debug() {
        let release = job(false).build_command();
        assert_eq!(
            release.args.last().unwrap(),
            "./packaging/build.sh -r 2>&1 | tee ./build/build_plugin_output.log; exit $PIPESTATUS"
        );
        assert_eq!(
            release.cwd.as_deref(),
            Some(Path::new("/home/irodsbuild/irods_build_local_plugin_dir"))
        );

        let debug = job(true).build_command();
        assert!(debug.args.last().unwrap().starts_with("./packaging/build.sh 2>&1"));
    }

    #[test]
    fn test_paths() {
        let job = job(false);
        assert_eq!(
            job.log_path(),
            PathBuf::from(
                "/home/irodsbuild/irods_build_local_plugin_dir/build/build_plugin_output.log"
            )
        );
        assert_eq!(
            default_work_dir(Path::new("/root")),
            PathBuf::from("/root/irods_build_local_plugin_dir")
        );
    }

    fn numbered(count: usize) -> String {
        (1..=count).map(|n| format!("line {}\n", n)).collect()
    }

    fn script_failure(stdout: String) -> CommandOutput {
        CommandOutput {
            code: 2,
            stdout,
            stderr: String::new(),
        }
    }

    #[tokio::test]
    async fn test_failure_reports_build_log_tail() {
        let job = job(false);
        let host = FakeHost::new()
            .with_file(job.log_path(), numbered(50))
            .respond("packaging/build.sh", script_failure("from stdout".to_string()));

        match run_build_script(&host, &job).await {
            Err(HarnessError::CommandExecution {
                code, output_tail, ..
            }) => {
                assert_eq!(code, 2);
                let lines: Vec<&str> = output_tail.lines().collect();
                assert_eq!(lines.len(), OUTPUT_TAIL_LINES);
                assert_eq!(lines[0], "line 11");
                assert_eq!(lines[OUTPUT_TAIL_LINES - 1], "line 50");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_without_log_reports_stdout_tail() {
        let job = job(true);
        let host = FakeHost::new().respond("packaging/build.sh", script_failure(numbered(45)));

        match run_build_script(&host, &job).await {
            Err(HarnessError::CommandExecution { output_tail, .. }) => {
                assert!(output_tail.starts_with("line 6\n"));
                assert!(output_tail.ends_with("line 45"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_successful_script_ignores_log() {
        let host = FakeHost::new();
        run_build_script(&host, &job(false)).await.unwrap();
        assert_eq!(host.commands(), vec![job(false).build_command()]);
    }
}
