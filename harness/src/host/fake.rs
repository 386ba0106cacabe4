//! In-memory host used by tests
//!
//! Commands are recorded instead of executed. Each recorded command is
//! answered by the first rule whose pattern occurs in its display form, or
//! with an empty success.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::HarnessError;
use crate::host::{CommandOutput, CommandSpec, HostEnvironment};

#[derive(Debug, Default)]
struct FakeState {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    commands: Vec<CommandSpec>,
    once: Vec<(String, CommandOutput)>,
    slept: Duration,
}

/// A host whose filesystem and processes are simulated
#[derive(Debug)]
pub struct FakeHost {
    state: Mutex<FakeState>,
    rules: Vec<(String, CommandOutput)>,
    closed_ports: BTreeSet<u16>,
    platform: String,
    hostname: Option<String>,
    home: PathBuf,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            rules: Vec::new(),
            closed_ports: BTreeSet::new(),
            platform: "Linux".to_string(),
            hostname: Some("icat.example.org".to_string()),
            home: PathBuf::from("/home/irodsbuild"),
        }
    }

    /// Seed a file
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.put_file(path.into(), contents.into());
        self
    }

    /// Seed an empty directory
    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.lock().dirs.insert(path.into());
        self
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    pub fn with_hostname(mut self, hostname: Option<&str>) -> Self {
        self.hostname = hostname.map(str::to_string);
        self
    }

    /// Answer commands containing `pattern` with `output`
    pub fn respond(mut self, pattern: &str, output: CommandOutput) -> Self {
        self.rules.push((pattern.to_string(), output));
        self
    }

    /// Make commands containing `pattern` exit with `code`
    pub fn fail_on(self, pattern: &str, code: i32) -> Self {
        let stderr = format!("simulated failure of {}", pattern);
        self.respond(pattern, CommandOutput::failure(code, stderr))
    }

    /// Make only the next command containing `pattern` exit with `code`
    pub fn fail_once(self, pattern: &str, code: i32) -> Self {
        let stderr = format!("simulated failure of {}", pattern);
        self.lock()
            .once
            .push((pattern.to_string(), CommandOutput::failure(code, stderr)));
        self
    }

    /// Refuse connections on `port`
    pub fn with_closed_port(mut self, port: u16) -> Self {
        self.closed_ports.insert(port);
        self
    }

    /// Seed the files a Linux distribution uses to identify itself
    pub fn with_os_release(self, name: &str, version_id: &str) -> Self {
        self.with_file(
            "/etc/os-release",
            format!("NAME=\"{}\"\nVERSION_ID=\"{}\"\n", name, version_id),
        )
    }

    /// Commands executed so far, in order
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.lock().commands.clone()
    }

    /// Display form of every executed command
    pub fn command_lines(&self) -> Vec<String> {
        self.lock().commands.iter().map(|c| c.to_string()).collect()
    }

    /// Current contents of a file
    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// Total time spent in [`HostEnvironment::sleep`]
    pub fn slept(&self) -> Duration {
        self.lock().slept
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn put_file(&self, path: PathBuf, contents: String) {
        let mut state = self.lock();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            state.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
        state.files.insert(path, contents);
    }

    fn not_found(path: &Path) -> HarnessError {
        HarnessError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        ))
    }
}

#[async_trait]
impl HostEnvironment for FakeHost {
    async fn execute(&self, command: &CommandSpec) -> Result<CommandOutput, HarnessError> {
        let line = command.to_string();
        let mut state = self.lock();
        state.commands.push(command.clone());
        if let Some(index) = state.once.iter().position(|(p, _)| line.contains(p.as_str())) {
            return Ok(state.once.remove(index).1);
        }
        drop(state);
        let output = self
            .rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        Ok(output)
    }

    async fn read_file(&self, path: &Path) -> Result<String, HarnessError> {
        self.file(path).ok_or_else(|| Self::not_found(path))
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), HarnessError> {
        self.put_file(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    async fn append_file(&self, path: &Path, contents: &str) -> Result<(), HarnessError> {
        let mut existing = self.file(path).unwrap_or_default();
        existing.push_str(contents);
        self.put_file(path.to_path_buf(), existing);
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    async fn create_dir(&self, path: &Path) -> Result<(), HarnessError> {
        let mut state = self.lock();
        let mut current = Some(path);
        while let Some(dir) = current {
            state.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
        Ok(())
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<String>, HarnessError> {
        let state = self.lock();
        if !state.dirs.contains(path) {
            return Err(Self::not_found(path));
        }
        let children: BTreeSet<String> = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        Ok(children.into_iter().collect())
    }

    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), HarnessError> {
        let mut state = self.lock();
        if !state.dirs.contains(from) {
            return Err(Self::not_found(from));
        }
        if state.dirs.contains(to) || state.files.contains_key(to) {
            return Err(HarnessError::IoError(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            )));
        }
        let files: Vec<(PathBuf, String)> = state
            .files
            .iter()
            .filter_map(|(p, c)| p.strip_prefix(from).ok().map(|rel| (to.join(rel), c.clone())))
            .collect();
        let dirs: Vec<PathBuf> = state
            .dirs
            .iter()
            .filter_map(|p| p.strip_prefix(from).ok().map(|rel| to.join(rel)))
            .collect();
        state.dirs.extend(dirs);
        state.dirs.extend(to.ancestors().map(Path::to_path_buf));
        state.files.extend(files);
        Ok(())
    }

    fn platform(&self) -> String {
        self.platform.clone()
    }

    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }

    fn home_dir(&self) -> PathBuf {
        self.home.clone()
    }

    async fn port_open(&self, _host: &str, port: u16) -> bool {
        !self.closed_ports.contains(&port)
    }

    async fn sleep(&self, duration: Duration) {
        self.lock().slept += duration;
    }
}
