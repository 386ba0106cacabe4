//! Per-platform KDC installation and realm setup

use std::path::Path;

use tracing::info;

use crate::configure::hosts;
use crate::errors::HarnessError;
use crate::host::{CommandSpec, HostEnvironment};
use crate::platform::{PlatformIdentity, Strategy};

pub const REALM: &str = "EXAMPLE.ORG";

/// Master key and password of every principal created here
pub const PASSWORD: &str = "krbtest";

pub const KRB5_CONF: &str = "/etc/krb5.conf";

const DEBCONF_SELECTIONS_FILE: &str = "/tmp/plugtest_krb5_debconf_selections";

const DEBCONF_SELECTIONS: &str = "\
krb5-config\tkrb5-config/read_conf\tboolean\ttrue
krb5-admin-server\tkrb5-admin-server/newrealm\tnote
krb5-kdc\tkrb5-kdc/debconf\tboolean\ttrue
krb5-admin-server\tkrb5-admin-server/kadmind\tboolean\ttrue
krb5-kdc\tkrb5-kdc/purge_data_too\tboolean\tfalse
krb5-config\tkrb5-config/add_servers\tboolean\ttrue
krb5-config\tkrb5-config/add_servers_realm\tstring\tEXAMPLE.ORG
krb5-config\tkrb5-config/default_realm\tstring\tEXAMPLE.ORG
krb5-config\tkrb5-config/admin_server\tstring\ticat.example.org
krb5-config\tkrb5-config/kerberos_servers\tstring\ticat.example.org
";

const DEBIAN_LOG_DIR: &str = "/var/log/kerberos";
const DEBIAN_LOG_FILES: &[&str] = &["krb5kdc.log", "kadmin.log", "krb5lib.log"];

const DEBIAN_LOGGING_SECTION: &str = "
[logging]
        kdc = FILE:/var/log/kerberos/krb5kdc.log
        admin_server = FILE:/var/log/kerberos/kadmin.log
        default = FILE:/var/log/kerberos/krb5lib.log
";

const DEBIAN_ACL: &str = "/etc/krb5kdc/kadm5.acl";

const REDHAT_KRB5_CONF: &str = "\
[logging]
 default = FILE:/var/log/krb5libs.log
 kdc = FILE:/var/log/krb5kdc.log
 admin_server = FILE:/var/log/kadmind.log

[libdefaults]
 default_realm = EXAMPLE.ORG
 dns_lookup_realm = false
 dns_lookup_kdc = false
 ticket_lifetime = 24h
 renew_lifetime = 7d
 forwardable = true

[realms]
 EXAMPLE.ORG = {
  kdc = icat.example.org
  admin_server = icat.example.org
 }

[domain_realm]
 .example.org = EXAMPLE.ORG
 example.org = EXAMPLE.ORG
";

const REDHAT_KDC_CONF_PATH: &str = "/var/kerberos/krb5kdc/kdc.conf";

const REDHAT_KDC_CONF: &str = "\
[kdcdefaults]
 kdc_ports = 88
 kdc_tcp_ports = 88

[realms]
 EXAMPLE.ORG = {
  #master_key_type = aes256-cts
  acl_file = /var/kerberos/krb5kdc/kadm5.acl
  dict_file = /usr/share/dict/words
  admin_keytab = /var/kerberos/krb5kdc/kadm5.keytab
  supported_enctypes = aes256-cts:normal aes128-cts:normal des3-hmac-sha1:normal arcfour-hmac:normal des-hmac-sha1:normal des-cbc-md5:normal des-cbc-crc:normal
 }
";

const REDHAT_ACL: &str = "/var/kerberos/krb5kdc/kadm5.acl";

/// Insert the example.org domain mapping after the `[domain_realm]` header
pub fn add_domain_realm(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    for line in text.split_inclusive('\n') {
        out.push_str(line);
        if line.contains("[domain_realm]") {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("        .example.org = EXAMPLE.ORG\n");
            out.push_str("        example.org = EXAMPLE.ORG\n");
        }
    }
    out
}

/// OS packages providing the KDC and admin server
pub fn kerberos_packages(strategy: Strategy) -> Vec<String> {
    let names: &[&str] = match strategy {
        Strategy::Debian => &["krb5-admin-server", "krb5-kdc"],
        Strategy::RedHat => &["krb5-server", "krb5-libs", "krb5-auth-dialog", "krb5-workstation"],
        Strategy::Suse => &[],
    };
    names.iter().map(|s| s.to_string()).collect()
}

/// Commands restarting and enabling the KDC and kadmind
pub fn restart_commands(
    identity: &PlatformIdentity,
    strategy: Strategy,
) -> Result<Vec<CommandSpec>, HarnessError> {
    let commands = match (strategy, identity.major_version.as_str()) {
        (Strategy::Debian, _) => vec![
            CommandSpec::new("invoke-rc.d").args(["krb5-admin-server", "restart"]),
            CommandSpec::new("invoke-rc.d").args(["krb5-kdc", "restart"]),
        ],
        (Strategy::RedHat, "6") => vec![
            CommandSpec::new("/etc/init.d/krb5kdc").arg("restart"),
            CommandSpec::new("/etc/init.d/kadmin").arg("restart"),
            CommandSpec::new("chkconfig").args(["krb5kdc", "on"]),
            CommandSpec::new("chkconfig").args(["kadmin", "on"]),
        ],
        (Strategy::RedHat, "7") => vec![
            CommandSpec::new("systemctl").args(["restart", "krb5kdc.service"]),
            CommandSpec::new("systemctl").args(["restart", "kadmin.service"]),
            CommandSpec::new("systemctl").args(["enable", "krb5kdc.service"]),
            CommandSpec::new("systemctl").args(["enable", "kadmin.service"]),
        ],
        _ => return Err(identity.unsupported()),
    };
    Ok(commands)
}

pub async fn install_packages(
    host: &dyn HostEnvironment,
    strategy: Strategy,
) -> Result<(), HarnessError> {
    if strategy == Strategy::Debian {
        host.write_file(Path::new(DEBCONF_SELECTIONS_FILE), DEBCONF_SELECTIONS)
            .await?;
        let preseed = CommandSpec::new("debconf-set-selections").arg(DEBCONF_SELECTIONS_FILE);
        host.run_command(&preseed).await?;
    }
    host.install_packages(strategy, &kerberos_packages(strategy))
        .await
}

pub async fn configure_realm(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    strategy: Strategy,
) -> Result<(), HarnessError> {
    match strategy {
        Strategy::Debian => {
            let newrealm = CommandSpec::new("krb5_newrealm").stdin(format!("{0}\n{0}\n", PASSWORD));
            host.run_command(&newrealm).await?;
            hosts::edit(host, Path::new(KRB5_CONF), add_domain_realm).await?;
            host.append_file(Path::new(KRB5_CONF), DEBIAN_LOGGING_SECTION)
                .await?;

            host.run_command(&CommandSpec::new("mkdir").arg(DEBIAN_LOG_DIR))
                .await?;
            for name in DEBIAN_LOG_FILES {
                let touch = CommandSpec::new("touch").arg(format!("{}/{}", DEBIAN_LOG_DIR, name));
                host.run_command(&touch).await?;
            }
            host.run_command(&CommandSpec::new("chmod").args(["-R", "750", DEBIAN_LOG_DIR]))
                .await?;
        }
        Strategy::RedHat => {
            host.write_file(Path::new(KRB5_CONF), REDHAT_KRB5_CONF).await?;
            host.write_file(Path::new(REDHAT_KDC_CONF_PATH), REDHAT_KDC_CONF)
                .await?;
            let create = CommandSpec::new("kdb5_util")
                .args(["create", "-r", REALM, "-s", "-W"])
                .stdin(format!("{0}\n{0}\n", PASSWORD));
            host.run_command(&create).await?;
        }
        Strategy::Suse => return Err(identity.unsupported()),
    }
    info!("Kerberos realm {} configured", REALM);
    Ok(())
}

pub async fn restart_kerberos(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    strategy: Strategy,
) -> Result<(), HarnessError> {
    for command in restart_commands(identity, strategy)? {
        host.run_command(&command).await?;
    }
    Ok(())
}

/// Grant every `*/admin` principal full rights
pub async fn enable_admin_privileges(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    strategy: Strategy,
) -> Result<(), HarnessError> {
    match strategy {
        Strategy::Debian => host.append_file(Path::new(DEBIAN_ACL), "*/admin *\n").await,
        Strategy::RedHat => {
            let acl = format!("*/admin@{} *\n", REALM);
            host.write_file(Path::new(REDHAT_ACL), &acl).await
        }
        Strategy::Suse => Err(identity.unsupported()),
    }
}
