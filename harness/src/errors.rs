//! Error types for plugtest

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for plugtest
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("cannot be used on platform {0}")]
    UnsupportedPlatform(String),

    #[error("Command `{command}` failed with exit code {code}: {output_tail}")]
    CommandExecution {
        command: String,
        code: i32,
        output_tail: String,
    },

    #[error("No plugin package matching '{prefix}' found in {directory:?}")]
    PluginPackageNotFound { directory: PathBuf, prefix: String },

    #[error("Malformed configuration file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Test module {module} failed with exit code {code}")]
    TestHarness { module: String, code: i32 },

    #[error("Service not ready: {0}")]
    ServiceNotReady(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Zone bundle error: {0}")]
    ZoneBundle(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl HarnessError {
    /// Exit code to hand back to the caller when this error ends the process.
    ///
    /// Harness failures forward the test runner's own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::TestHarness { code, .. } if *code > 0 => *code,
            HarnessError::CommandExecution { code, .. } if *code > 0 => *code,
            _ => 1,
        }
    }
}
