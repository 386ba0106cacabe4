//! Host introspection for [`PlatformIdentity`]

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::host::HostEnvironment;
use crate::platform::PlatformIdentity;
use crate::utils::capitalize;

const OS_RELEASE: &str = "/etc/os-release";
const REDHAT_RELEASE: &str = "/etc/redhat-release";
const LSB_RELEASE: &str = "/etc/lsb-release";

impl PlatformIdentity {
    /// Inspect the host's release files.
    ///
    /// A host without recognizable release files yields an identity with no
    /// distribution, which no strategy accepts.
    pub async fn detect(host: &dyn HostEnvironment) -> PlatformIdentity {
        let platform = host.platform();

        let release = match host.read_file(Path::new(OS_RELEASE)).await {
            Ok(text) => parse_key_values(&text, "NAME", "VERSION_ID"),
            Err(_) => None,
        };
        let release = match release {
            Some(found) => Some(found),
            None => match host.read_file(Path::new(REDHAT_RELEASE)).await {
                Ok(text) => parse_redhat_release(&text),
                Err(_) => None,
            },
        };
        let release = match release {
            Some(found) => Some(found),
            None => match host.read_file(Path::new(LSB_RELEASE)).await {
                Ok(text) => parse_key_values(&text, "DISTRIB_ID", "DISTRIB_RELEASE"),
                Err(_) => None,
            },
        };

        let identity = match release {
            Some((name, version)) => PlatformIdentity {
                platform,
                distribution: Some(capitalize(&name)),
                major_version: major_of(&version),
            },
            None => PlatformIdentity {
                platform,
                distribution: None,
                major_version: String::new(),
            },
        };
        debug!("Detected platform: {:?}", identity);
        identity
    }
}

/// `KEY=value` / `KEY="value"` files such as os-release and lsb-release
fn parse_key_values(text: &str, name_key: &str, version_key: &str) -> Option<(String, String)> {
    let values: HashMap<&str, &str> = text
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim().trim_matches('"').trim_matches('\'')))
        .collect();
    let name = values.get(name_key)?;
    let version = values.get(version_key).copied().unwrap_or_default();
    Some((name.to_string(), version.to_string()))
}

/// "CentOS release 6.9 (Final)" -> ("CentOS", "6.9")
fn parse_redhat_release(text: &str) -> Option<(String, String)> {
    let line = text.lines().next()?.trim();
    let (name, rest) = line.split_once(" release ")?;
    let version = rest.split_whitespace().next().unwrap_or_default();
    Some((name.trim().to_string(), version.to_string()))
}

fn major_of(version: &str) -> String {
    version.split('.').next().unwrap_or_default().to_string()
}
