//! HPSS client and server preparation for the HPSS resource plugin tests

use std::path::Path;

use tracing::{info, warn};

use crate::configure::{hosts, server_config};
use crate::errors::HarnessError;
use crate::host::{user_ids, CommandSpec, HostEnvironment};
use crate::testing::SERVICE_ACCOUNT;

pub const HPSS_HOST: &str = "hpss743.example.org";
const HPSS_ALIAS: &str = "hpss743";

const SERVICE_PASSWORD: &str = "notasecret";
const HPSS_BIN: &str = "/opt/hpss/bin";
const TIRPC_SONAME: &str = "/lib64/libtirpc.so.1";
const VAULT: &str = "/irodsVault";

/// Plugin packages are installed without dependency resolution
pub fn plugin_install_command(package: &Path) -> CommandSpec {
    CommandSpec::sudo(["rpm", "-i", "--nodeps"]).arg(package.to_string_lossy())
}

/// `scrub` session recreating the vault owned by `uid:gid`
pub fn vault_script(uid: u32, gid: u32) -> String {
    format!(
        "\nunlink {0} recurse top\nmkdir {0}\nchown {0} {1}\nchgrp {0} {2}\nquit\n",
        VAULT, uid, gid
    )
}

fn hpss_tool(name: &str) -> CommandSpec {
    CommandSpec::new(format!("{}/{}", HPSS_BIN, name))
}

/// Bring up HPSS and register the service account with it
pub async fn configure_hpss(host: &dyn HostEnvironment) -> Result<(), HarnessError> {
    host.run_command(
        &CommandSpec::new("passwd")
            .arg(SERVICE_ACCOUNT)
            .stdin(format!("{0}\n{0}\n", SERVICE_PASSWORD)),
    )
    .await?;

    hosts::edit(host, Path::new(hosts::ETC_HOSTS), |text| {
        hosts::append_alias(text, HPSS_HOST, HPSS_ALIAS)
    })
    .await?;
    let link = CommandSpec::new("ln").args(["-s", TIRPC_SONAME, server_config::TIRPC_LIBRARY]);
    host.run_command(&link).await?;
    server_config::patch_file(
        host,
        Path::new(server_config::SERVER_CONFIG),
        &server_config::ld_preload_patch(),
    )
    .await?;
    hosts::edit(host, Path::new(hosts::HOSTS_ALLOW), hosts::remove_deny_all).await?;

    host.run_command(&CommandSpec::new("/etc/init.d/rpcbind").arg("restart"))
        .await?;
    host.run_command(&hpss_tool("rc.hpss").arg("start")).await?;
    host.run_command(
        &hpss_tool("hpssadm.pl")
            .args(["-U", "hpssssm", "-A", "unix", "-a", "/var/hpss/etc/hpss.unix.keytab"])
            .stdin("server start -all\nquit\n"),
    )
    .await?;

    let (uid, gid) = user_ids(host, SERVICE_ACCOUNT).await?;
    let (uid_arg, gid_arg) = (uid.to_string(), gid.to_string());
    host.run_command(&hpss_tool("hpssuser").args([
        "-add",
        SERVICE_ACCOUNT,
        "-unix",
        "-gid",
        gid_arg.as_str(),
        "-uid",
        uid_arg.as_str(),
        "-group",
        SERVICE_ACCOUNT,
        "-fullname",
        "\"irods\"",
        "-home",
        "/var/lib/irods",
        "-unixkeytab",
        "/var/hpss/etc/irods.keytab",
        "-shell",
        "/bin/bash",
        "-hpsshome",
        "/opt/hpss",
        "-password",
        SERVICE_PASSWORD,
    ]))
    .await?;

    host.run_command(
        &hpss_tool("scrub")
            .args(["-a", "unix", "-k", "-t", "/var/hpss/etc/root.unix.keytab", "-p", "root"])
            .stdin(vault_script(uid, gid)),
    )
    .await?;

    let restart = CommandSpec::new("service").args(["irods", "restart"]);
    let output = host.execute(&restart).await?;
    if !output.is_success() {
        warn!("`{}` exited with {}; continuing", restart, output.code);
    }
    info!("HPSS configured");
    Ok(())
}
