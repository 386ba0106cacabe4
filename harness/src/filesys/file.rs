//! File operations

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::HarnessError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, HarnessError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file as JSON.
    ///
    /// Malformed content is reported as [`HarnessError::ConfigParse`] naming the file.
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, HarnessError> {
        let contents = self.read_string().await?;
        serde_json::from_str(&contents).map_err(|source| HarnessError::ConfigParse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write string to file, replacing its contents
    pub async fn write_string(&self, contents: &str) -> Result<(), HarnessError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&self.path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Append string to file, creating it if missing
    pub async fn append_string(&self, contents: &str) -> Result<(), HarnessError> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }
}
