//! Installed iRODS server version

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::errors::HarnessError;
use crate::host::HostEnvironment;

const VERSION_JSON: &str = "/var/lib/irods/VERSION.json";
const LEGACY_VERSION: &str = "/var/lib/irods/VERSION";

/// Major, minor and patch of the iRODS server on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IrodsVersion(pub u32, pub u32, pub u32);

#[derive(Deserialize)]
struct VersionFile {
    irods_version: String,
}

impl IrodsVersion {
    /// The release that moved the test harness to `scripts/`
    pub const SCRIPTS_LAYOUT: IrodsVersion = IrodsVersion(4, 2, 0);

    pub fn parse(text: &str) -> Option<IrodsVersion> {
        let mut parts = text.trim().split('.').map(|p| p.trim().parse::<u32>());
        let major = parts.next()?.ok()?;
        let minor = parts.next().and_then(Result::ok).unwrap_or(0);
        let patch = parts.next().and_then(Result::ok).unwrap_or(0);
        Some(IrodsVersion(major, minor, patch))
    }

    /// Read the version from `VERSION.json` (4.2+) or the legacy `VERSION` file
    pub async fn detect(host: &dyn HostEnvironment) -> Result<IrodsVersion, HarnessError> {
        if let Ok(text) = host.read_file(Path::new(VERSION_JSON)).await {
            let file: VersionFile =
                serde_json::from_str(&text).map_err(|source| HarnessError::ConfigParse {
                    path: VERSION_JSON.into(),
                    source,
                })?;
            return IrodsVersion::parse(&file.irods_version).ok_or_else(|| {
                HarnessError::NotFound(format!("Unparseable iRODS version {}", file.irods_version))
            });
        }

        let text = host.read_file(Path::new(LEGACY_VERSION)).await.map_err(|_| {
            HarnessError::NotFound("No iRODS version file found; is iRODS installed?".to_string())
        })?;
        text.lines()
            .filter_map(|line| line.strip_prefix("IRODSVERSION="))
            .find_map(IrodsVersion::parse)
            .ok_or_else(|| HarnessError::NotFound(format!("No IRODSVERSION in {}", LEGACY_VERSION)))
    }

    pub fn has_scripts_layout(&self) -> bool {
        *self >= Self::SCRIPTS_LAYOUT
    }

    /// Server control script
    pub fn irodsctl(&self) -> &'static str {
        if self.has_scripts_layout() {
            "/var/lib/irods/irodsctl"
        } else {
            "/var/lib/irods/iRODS/irodsctl"
        }
    }

    /// Test harness directory, relative to the service account's home
    pub fn tests_dir(&self) -> &'static str {
        if self.has_scripts_layout() {
            "scripts"
        } else {
            "tests/pydevtest"
        }
    }
}

impl fmt::Display for IrodsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}
