//! Module directory for Ansible's `-M` option
//!
//! Ansible runs a binary module by the file name it finds on its module path,
//! so every module name becomes a symlink to this binary.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::errors::HarnessError;
use crate::filesys::dir::Dir;
use crate::modules::ModuleName;

/// Module a binary was invoked as, judging by its file name
pub fn module_from_argv0(argv0: &str) -> Option<ModuleName> {
    let name = Path::new(argv0).file_name()?.to_str()?;
    name.parse().ok()
}

/// Create `<dir>/<module>` links to `target`, replacing stale ones
pub async fn link_modules(dir: &Path, target: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    Dir::new(dir).create().await?;

    let mut links = Vec::with_capacity(ModuleName::ALL.len());
    for name in ModuleName::ALL {
        let link = dir.join(name.as_str());
        if fs::symlink_metadata(&link).await.is_ok() {
            fs::remove_file(&link).await?;
        }
        symlink(target, &link).await?;
        links.push(link);
    }
    info!("Linked {} modules in {:?}", links.len(), dir);
    Ok(links)
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> Result<(), HarnessError> {
    Ok(fs::symlink(target, link).await?)
}

#[cfg(not(unix))]
async fn symlink(target: &Path, link: &Path) -> Result<(), HarnessError> {
    fs::copy(target, link).await?;
    Ok(())
}
