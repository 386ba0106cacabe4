//! The machine plugtest runs on

use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::Command;

use crate::errors::HarnessError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::host::{CommandOutput, CommandSpec, HostEnvironment};
use crate::utils::capitalize;

/// Connect timeout per port check
const CONNECT_TIMEOUT_MS: u64 = 500;

/// Host environment backed by the local OS
#[derive(Debug, Clone, Default)]
pub struct LocalHost;

impl LocalHost {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostEnvironment for LocalHost {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, HarnessError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| {
            HarnessError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to start `{}`: {}", spec, e),
            ))
        })?;

        if let (Some(data), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            match stdin.write_all(data.as_bytes()).await {
                // The child exited without reading; its status says why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                result => result?,
            }
            // Dropping stdin closes the pipe
        }

        let output = child.wait_with_output().await?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn read_file(&self, path: &Path) -> Result<String, HarnessError> {
        File::new(path).read_string().await
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), HarnessError> {
        File::new(path).write_string(contents).await
    }

    async fn append_file(&self, path: &Path, contents: &str) -> Result<(), HarnessError> {
        File::new(path).append_string(contents).await
    }

    async fn exists(&self, path: &Path) -> bool {
        File::new(path).exists().await
    }

    async fn create_dir(&self, path: &Path) -> Result<(), HarnessError> {
        Dir::new(path).create().await
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<String>, HarnessError> {
        Dir::new(path).list_names().await
    }

    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), HarnessError> {
        Dir::new(from).copy_to(to).await
    }

    fn platform(&self) -> String {
        capitalize(std::env::consts::OS)
    }

    fn hostname(&self) -> Option<String> {
        sysinfo::System::host_name()
    }

    fn home_dir(&self) -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/root"))
    }

    async fn port_open(&self, host: &str, port: u16) -> bool {
        let addr = match (host, port).to_socket_addrs().ok().and_then(|mut a| a.next()) {
            Some(addr) => addr,
            None => return false,
        };
        let timeout = Duration::from_millis(CONNECT_TIMEOUT_MS);
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
