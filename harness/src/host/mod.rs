//! Host capabilities
//!
//! Every component receives a [`HostEnvironment`] instead of touching the
//! machine directly. [`local::LocalHost`] is the real implementation;
//! [`fake::FakeHost`] records commands and keeps files in memory.

pub mod command;
pub mod fake;
pub mod local;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::HarnessError;
use crate::installer::packages;
use crate::platform::Strategy;

pub use command::{CommandOutput, CommandSpec};

/// Capabilities the provisioning steps need from the host
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Run a command and return its output whatever the exit code
    async fn execute(&self, command: &CommandSpec) -> Result<CommandOutput, HarnessError>;

    /// Read a text file
    async fn read_file(&self, path: &Path) -> Result<String, HarnessError>;

    /// Replace a text file's contents, creating it if missing
    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), HarnessError>;

    /// Append to a text file, creating it if missing
    async fn append_file(&self, path: &Path, contents: &str) -> Result<(), HarnessError>;

    /// Whether anything exists at `path`
    async fn exists(&self, path: &Path) -> bool;

    /// Create a directory and its parents
    async fn create_dir(&self, path: &Path) -> Result<(), HarnessError>;

    /// Sorted entry names of a directory
    async fn list_dir(&self, path: &Path) -> Result<Vec<String>, HarnessError>;

    /// Recursively copy `from` to `to`; `to` must not exist
    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), HarnessError>;

    /// Operating system family, e.g. "Linux"
    fn platform(&self) -> String;

    /// Fully qualified host name
    fn hostname(&self) -> Option<String>;

    /// Home directory of the invoking user
    fn home_dir(&self) -> PathBuf;

    /// Whether a TCP connection to `host:port` succeeds
    async fn port_open(&self, host: &str, port: u16) -> bool;

    async fn sleep(&self, duration: Duration);

    /// Run a command; a nonzero exit is an error
    async fn run_command(&self, command: &CommandSpec) -> Result<CommandOutput, HarnessError> {
        debug!("Running: {}", command);
        self.execute(command).await?.check(command)
    }

    /// Install named OS packages with the strategy's package manager
    async fn install_packages(
        &self,
        strategy: Strategy,
        names: &[String],
    ) -> Result<(), HarnessError> {
        for command in packages::install_commands(strategy, names) {
            self.run_command(&command).await?;
        }
        Ok(())
    }

    /// Install local package files with the strategy's local installer
    ///
    /// On Debian a failed `dpkg -i` is tolerated until `apt-get install -f`
    /// has pulled in the missing dependencies, then dpkg runs again checked.
    async fn install_local_packages(
        &self,
        strategy: Strategy,
        files: &[PathBuf],
    ) -> Result<(), HarnessError> {
        if strategy == Strategy::Debian && !files.is_empty() {
            let dpkg = packages::dpkg_install(files);
            debug!("Running: {}", dpkg);
            let first = self.execute(&dpkg).await?;
            if !first.is_success() {
                warn!("`{}` exited with {}, resolving dependencies", dpkg, first.code);
            }
            self.run_command(&packages::fix_broken()).await?;
            if !first.is_success() {
                self.run_command(&dpkg).await?;
            }
            return Ok(());
        }
        for command in packages::local_install_commands(strategy, files) {
            self.run_command(&command).await?;
        }
        Ok(())
    }
}

/// Numeric uid and gid of a local account
pub async fn user_ids(host: &dyn HostEnvironment, user: &str) -> Result<(u32, u32), HarnessError> {
    let uid = id_query(host, "-u", user).await?;
    let gid = id_query(host, "-g", user).await?;
    Ok((uid, gid))
}

async fn id_query(host: &dyn HostEnvironment, flag: &str, user: &str) -> Result<u32, HarnessError> {
    let output = host
        .run_command(&CommandSpec::new("id").args([flag, user]))
        .await?;
    output.stdout.trim().parse().map_err(|_| {
        HarnessError::NotFound(format!(
            "`id {} {}` returned {:?}",
            flag,
            user,
            output.stdout.trim()
        ))
    })
}
