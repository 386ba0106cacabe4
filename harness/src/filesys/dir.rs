//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::HarnessError;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), HarnessError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Names of all entries in the directory, sorted
    pub async fn list_names(&self) -> Result<Vec<String>, HarnessError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        names.sort();
        Ok(names)
    }

    /// Recursively copy this directory to `target`.
    ///
    /// `target` must not exist yet.
    pub async fn copy_to(&self, target: &Path) -> Result<(), HarnessError> {
        if fs::metadata(target).await.is_ok() {
            return Err(HarnessError::IoError(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            )));
        }

        let mut pending = vec![(self.path.clone(), target.to_path_buf())];
        while let Some((from, to)) = pending.pop() {
            fs::create_dir_all(&to).await?;
            let mut entries = fs::read_dir(&from).await?;
            while let Some(entry) = entries.next_entry().await? {
                let destination = to.join(entry.file_name());
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), destination));
                } else {
                    fs::copy(entry.path(), destination).await?;
                }
            }
        }

        Ok(())
    }
}
