//! External command description and captured output

use std::fmt;
use std::path::PathBuf;

use crate::errors::HarnessError;
use crate::utils::{shell_quote, tail_lines};

/// Lines of captured output kept in a failure message
pub const OUTPUT_TAIL_LINES: usize = 40;

/// A command to run on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Data written to the command's stdin, then closed
    pub stdin: Option<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            env: Vec::new(),
        }
    }

    /// `sudo <args...>`
    pub fn sudo<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("sudo").args(args)
    }

    /// Run `script` in a login shell of `user`: `sudo su - <user> -c <script>`
    pub fn as_user(user: &str, script: impl Into<String>) -> Self {
        Self::sudo(["su", "-", user, "-c"]).arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Exit status and captured streams of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; -1 when the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Turn a nonzero exit into [`HarnessError::CommandExecution`]
    pub fn check(self, command: &CommandSpec) -> Result<Self, HarnessError> {
        if self.is_success() {
            return Ok(self);
        }
        let combined = format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end());
        Err(HarnessError::CommandExecution {
            command: command.to_string(),
            code: self.code,
            output_tail: tail_lines(combined.trim(), OUTPUT_TAIL_LINES),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_scripts() {
        let cmd = CommandSpec::as_user("irods", "cd scripts; python run_tests.py");
        assert_eq!(
            cmd.to_string(),
            "sudo su - irods -c 'cd scripts; python run_tests.py'"
        );
    }

    #[test]
    fn test_check_reports_output() {
        let cmd = CommandSpec::sudo(["yum", "install", "-y", "nope"]);
        let err = CommandOutput {
            code: 1,
            stdout: "Loaded plugins".to_string(),
            stderr: "No package nope available.".to_string(),
        }
        .check(&cmd)
        .unwrap_err();

        match err {
            HarnessError::CommandExecution { command, code, output_tail } => {
                assert_eq!(command, "sudo yum install -y nope");
                assert_eq!(code, 1);
                assert!(output_tail.contains("No package nope available."));
                assert!(output_tail.contains("Loaded plugins"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_passes_success() {
        let cmd = CommandSpec::new("true");
        let output = CommandOutput::success("ok").check(&cmd).unwrap();
        assert_eq!(output.stdout, "ok");
    }
}
