//! Per-platform build prerequisites

use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::HarnessError;
use crate::host::{CommandSpec, HostEnvironment};
use crate::platform::{PlatformIdentity, Strategy};

/// Package files every plugin build links against, matched by name
pub const IRODS_BUILD_PACKAGES: &[&str] = &["irods-dev-", "irods-runtime-"];

const HPSS_PACKAGE_DIR: &str = "/projects/irods/vsphere-testing/externals/hpss";
const HPSS_PACKAGES: &[&str] = &[
    "hpss-lib-7.4.3.2-0.el6.x86_64.rpm",
    "hpss-lib-devel-7.4.3.2-0.el6.x86_64.rpm",
    "hpss-clnt-7.4.3.2-0.el6.x86_64.rpm",
];
const HPSS_SOURCE: &str = "/hpss_src/hpss-7.4.3.2-0.el6";
const HPSS_ROOT: &str = "/opt/hpss";

/// Globus libraries that ship without an unversioned `.so` link
const GLOBUS_LIBRARIES: &[(&str, &str)] = &[
    ("libglobus_callout.so.0", "libglobus_callout.so"),
    ("libglobus_gss_assist.so.3", "libglobus_gss_assist.so"),
];

/// OS packages needed to build any plugin
pub fn building_dependencies(strategy: Strategy) -> Vec<String> {
    let packages: &[&str] = match strategy {
        Strategy::RedHat => &[
            "python-devel",
            "help2man",
            "unixODBC",
            "fuse-devel",
            "curl-devel",
            "bzip2-devel",
            "zlib-devel",
            "pam-devel",
            "openssl-devel",
            "libxml2-devel",
            "krb5-devel",
            "unixODBC-devel",
            "perl-JSON",
            "globus-proxy-utils",
            "globus-gssapi-gsi-devel",
        ],
        Strategy::Debian => &[
            "git",
            "g++",
            "make",
            "python-dev",
            "help2man",
            "unixodbc",
            "libfuse-dev",
            "libcurl4-gnutls-dev",
            "libbz2-dev",
            "zlib1g-dev",
            "libpam0g-dev",
            "libssl-dev",
            "libxml2-dev",
            "libkrb5-dev",
            "unixodbc-dev",
            "libjson-perl",
            "globus-proxy-utils",
            "libglobus-gssapi-gsi-dev",
        ],
        Strategy::Suse => &[
            "python-devel",
            "help2man",
            "unixODBC",
            "fuse-devel",
            "libcurl-devel",
            "libbz2-devel",
            "libopenssl-devel",
            "libxml2-devel",
            "krb5-devel",
            "perl-JSON",
            "unixODBC-devel",
        ],
    };
    packages.iter().map(|p| p.to_string()).collect()
}

/// Directories the Globus libraries live in
fn globus_library_dirs(strategy: Strategy) -> &'static [&'static str] {
    match strategy {
        Strategy::RedHat => &["/usr/lib64"],
        // Ubuntu 12 uses /usr/lib, later releases the multiarch directory
        Strategy::Debian => &["/usr/lib", "/usr/lib/x86_64-linux-gnu"],
        Strategy::Suse => &[],
    }
}

fn symlink(target: &str, link: &str) -> CommandSpec {
    CommandSpec::sudo(["ln", "-s", target, link])
}

/// Commands run after the package installs for plugins needing extra setup
pub fn plugin_specific_commands(strategy: Strategy) -> Vec<CommandSpec> {
    let mut commands = Vec::new();
    if strategy == Strategy::RedHat {
        commands.push(symlink(HPSS_SOURCE, HPSS_ROOT));
    }
    for dir in globus_library_dirs(strategy) {
        for (versioned, unversioned) in GLOBUS_LIBRARIES {
            commands.push(symlink(
                &format!("{}/{}", dir, versioned),
                &format!("{}/{}", dir, unversioned),
            ));
        }
    }
    commands
}

/// Local package files installed before the plugin-specific commands
pub fn plugin_specific_packages(strategy: Strategy) -> Vec<PathBuf> {
    match strategy {
        Strategy::RedHat => HPSS_PACKAGES
            .iter()
            .map(|name| Path::new(HPSS_PACKAGE_DIR).join(name))
            .collect(),
        Strategy::Debian | Strategy::Suse => Vec::new(),
    }
}

/// Install everything a plugin build needs on this host
pub async fn install_building_dependencies(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    strategy: Strategy,
    irods_packages_root: &Path,
) -> Result<(), HarnessError> {
    info!("Installing {} build dependencies", strategy);
    host.install_packages(strategy, &building_dependencies(strategy))
        .await?;

    let packages_dir = irods_packages_root.join(identity.platform_string());
    let available = host.list_dir(&packages_dir).await?;
    for marker in IRODS_BUILD_PACKAGES {
        let name = available
            .iter()
            .find(|name| name.contains(marker))
            .ok_or_else(|| HarnessError::PluginPackageNotFound {
                directory: packages_dir.clone(),
                prefix: marker.to_string(),
            })?;
        host.install_local_packages(strategy, &[packages_dir.join(name)])
            .await?;
    }

    host.install_local_packages(strategy, &plugin_specific_packages(strategy))
        .await?;
    for command in plugin_specific_commands(strategy) {
        host.run_command(&command).await?;
    }
    Ok(())
}
