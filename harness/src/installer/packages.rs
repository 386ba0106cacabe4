//! Package-manager command table
//!
//! One entry per [`Strategy`]. Package order is passed through untouched and
//! an empty list produces no commands.

use std::path::PathBuf;

use crate::host::CommandSpec;
use crate::platform::Strategy;

/// Commands installing named packages from the distribution's repositories
pub fn install_commands(strategy: Strategy, names: &[String]) -> Vec<CommandSpec> {
    if names.is_empty() {
        return Vec::new();
    }
    let names = names.iter().cloned();

    match strategy {
        Strategy::RedHat => vec![CommandSpec::sudo(["yum", "install", "-y"]).args(names)],
        Strategy::Debian => vec![
            apt_get(["update"]),
            apt_get(["install", "-y"]).args(names),
        ],
        Strategy::Suse => {
            vec![CommandSpec::sudo(["zypper", "--non-interactive", "install"]).args(names)]
        }
    }
}

/// Commands installing package files already on the host
pub fn local_install_commands(strategy: Strategy, files: &[PathBuf]) -> Vec<CommandSpec> {
    if files.is_empty() {
        return Vec::new();
    }
    match strategy {
        Strategy::RedHat => vec![
            CommandSpec::sudo(["yum", "localinstall", "-y", "--nogpgcheck"]).args(file_args(files)),
        ],
        Strategy::Debian => vec![dpkg_install(files), fix_broken()],
        Strategy::Suse => vec![CommandSpec::sudo([
            "zypper",
            "--non-interactive",
            "install",
            "--no-gpg-checks",
        ])
        .args(file_args(files))],
    }
}

/// `dpkg -i` over local .deb files; exits 1 when dependencies are missing
pub fn dpkg_install(files: &[PathBuf]) -> CommandSpec {
    CommandSpec::sudo(["dpkg", "-i"]).args(file_args(files))
}

/// Pull in whatever dpkg left unresolved
pub fn fix_broken() -> CommandSpec {
    apt_get(["install", "-f", "-y"])
}

fn file_args(files: &[PathBuf]) -> impl Iterator<Item = String> + '_ {
    files.iter().map(|f| f.to_string_lossy().into_owned())
}

fn apt_get<const N: usize>(args: [&str; N]) -> CommandSpec {
    CommandSpec::sudo(["-E", "apt-get"])
        .args(args)
        .env("DEBIAN_FRONTEND", "noninteractive")
}
