//! Platform identity and strategy selection
//!
//! Each OS family gets exactly one [`Strategy`]. Selection is a table lookup
//! with no side effects; anything outside the table is an
//! [`HarnessError::UnsupportedPlatform`] and callers must stop there.

pub mod detect;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::HarnessError;

/// Platform-specific variant of installation and configuration behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// CentOS / RHEL: yum, rpm
    RedHat,
    /// Ubuntu / Debian: apt-get, dpkg
    Debian,
    /// openSUSE / SLES: zypper
    Suse,
}

/// Distribution names (as capitalized by [`crate::utils::capitalize`]) and their strategy
const DISTRIBUTIONS: &[(&str, Strategy)] = &[
    ("Centos", Strategy::RedHat),
    ("Centos linux", Strategy::RedHat),
    ("Red hat enterprise linux server", Strategy::RedHat),
    ("Ubuntu", Strategy::Debian),
    ("Debian", Strategy::Debian),
    ("Debian gnu/linux", Strategy::Debian),
    ("Opensuse", Strategy::Suse),
    ("Opensuse leap", Strategy::Suse),
    ("Suse linux enterprise server", Strategy::Suse),
];

/// The only platform family with strategies
const SUPPORTED_PLATFORM: &str = "Linux";

impl Strategy {
    /// Select the strategy for a platform family and distribution name
    pub fn resolve(platform: &str, distribution: Option<&str>) -> Result<Strategy, HarnessError> {
        let unsupported = || HarnessError::UnsupportedPlatform(describe(platform, distribution));

        if !platform.trim().eq_ignore_ascii_case(SUPPORTED_PLATFORM) {
            return Err(unsupported());
        }
        let distribution = distribution.map(str::trim).ok_or_else(unsupported)?;

        DISTRIBUTIONS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(distribution))
            .map(|(_, strategy)| *strategy)
            .ok_or_else(unsupported)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::RedHat => write!(f, "RedHat"),
            Strategy::Debian => write!(f, "Debian"),
            Strategy::Suse => write!(f, "Suse"),
        }
    }
}

fn describe(platform: &str, distribution: Option<&str>) -> String {
    match distribution {
        Some(distribution) => format!("{} ({})", platform, distribution),
        None => platform.to_string(),
    }
}

/// What the host reports about itself. Resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformIdentity {
    /// OS family, e.g. "Linux"
    pub platform: String,

    /// Capitalized distribution name, e.g. "Ubuntu" or "Centos linux"
    pub distribution: Option<String>,

    /// Major version, e.g. "14" or "7"
    pub major_version: String,
}

impl PlatformIdentity {
    pub fn new(platform: &str, distribution: Option<&str>, major_version: &str) -> Self {
        Self {
            platform: platform.to_string(),
            distribution: distribution.map(str::to_string),
            major_version: major_version.to_string(),
        }
    }

    pub fn strategy(&self) -> Result<Strategy, HarnessError> {
        Strategy::resolve(&self.platform, self.distribution.as_deref())
    }

    /// Resolve the strategy and fail unless it is one of `supported`
    pub fn require(&self, supported: &[Strategy]) -> Result<Strategy, HarnessError> {
        let strategy = self.strategy()?;
        if supported.contains(&strategy) {
            Ok(strategy)
        } else {
            Err(self.unsupported())
        }
    }

    /// `UnsupportedPlatform` naming this host, e.g. "Linux (Opensuse leap)"
    pub fn unsupported(&self) -> HarnessError {
        HarnessError::UnsupportedPlatform(describe(&self.platform, self.distribution.as_deref()))
    }

    /// Directory name used under package and output roots, e.g. "Ubuntu_14"
    pub fn platform_string(&self) -> String {
        let name = self.distribution.as_deref().unwrap_or(&self.platform);
        format!("{}_{}", name.trim(), self.major_version)
    }
}
