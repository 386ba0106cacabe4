//! Kerberos scenario end to end

use std::time::Duration;

use serde_json::{json, Value};

use plugtest::errors::HarnessError;
use plugtest::host::fake::FakeHost;
use plugtest::host::CommandOutput;
use plugtest::modules::{self, ModuleName};

fn ubuntu_host() -> FakeHost {
    FakeHost::new()
        .with_os_release("Ubuntu", "16.04")
        .with_file("/var/lib/irods/VERSION.json", r#"{"irods_version": "4.2.1"}"#)
        .with_file("/etc/hosts", "127.0.0.1 localhost\n10.0.0.5 icat.example.org\n")
        .with_file("/etc/krb5.conf", "[libdefaults]\n\tdefault_realm = EXAMPLE.ORG\n[domain_realm]\n")
        .with_file(
            "/etc/irods/server_config.json",
            r#"{"zone_name": "tempZone", "environment_variables": {"PATH": "/usr/bin"}}"#,
        )
        .with_file("/pkgs/Ubuntu_16/irods-auth-krb-4.2.1.deb", "")
        .respond(
            "klist",
            CommandOutput::success("Ticket cache: FILE:/tmp/krb5cc_0\nDefault principal: krb_user@EXAMPLE.ORG\n"),
        )
}

fn args() -> Value {
    json!({
        "plugin_package_root_directory": "/pkgs",
        "plugin_package_prefix": "irods-auth-krb",
        "python_test_module_to_run": "test_krb.Test_Authentication",
        "output_directory": "/out",
        "_ansible_no_log": false,
    })
}

#[tokio::test]
async fn test_kerberos_scenario_on_ubuntu() {
    let host = ubuntu_host();
    let result = modules::run(&host, ModuleName::IrodsTestAuthKerberos, &args())
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.complex_args.unwrap()["plugin_package_prefix"], "irods-auth-krb");

    let written = host.file("/tmp/krb5_test_cfg.json").unwrap();
    let test_config: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(test_config["client_user_principal"], "krb_user@EXAMPLE.ORG");
    assert_eq!(test_config["client_user_ticket_cache"], "FILE:/tmp/krb5cc_0");

    let server_config: Value =
        serde_json::from_str(&host.file("/etc/irods/server_config.json").unwrap()).unwrap();
    assert_eq!(server_config["zone_name"], "tempZone");
    assert_eq!(server_config["KerberosServicePrincipal"], "irods/icat.example.org@EXAMPLE.ORG");
    assert_eq!(server_config["environment_variables"]["PATH"], "/usr/bin");
    assert_eq!(
        server_config["environment_variables"]["KRB5_KTNAME"],
        "/var/lib/irods/irods.keytab"
    );

    assert!(host.file("/etc/hosts").unwrap().contains("10.0.0.5 icat.example.org icat\n"));
    let krb5_conf = host.file("/etc/krb5.conf").unwrap();
    assert!(krb5_conf.contains("[domain_realm]\n        .example.org = EXAMPLE.ORG\n"));
    assert!(krb5_conf.contains("[logging]"));
    assert_eq!(host.file("/etc/krb5kdc/kadm5.acl").unwrap(), "*/admin *\n");

    let lines = host.command_lines();
    let position = |needle: &str| lines.iter().position(|l| l.contains(needle)).unwrap();
    let install = position("dpkg -i /pkgs/Ubuntu_16/irods-auth-krb-4.2.1.deb");
    assert!(position("kinit krb_user") < install);
    assert!(lines.contains(&"chmod o+r /tmp/krb5cc_0".to_string()));
    assert!(lines.contains(&"chown irods:irods /tmp/krb5_test_cfg.json".to_string()));
    assert_eq!(lines.iter().filter(|l| l.contains("run_tests.py")).count(), 1);
    assert_eq!(
        lines.last().unwrap(),
        "sudo su - irods -c 'cd scripts; python run_tests.py --xml_output --run_specific_test test_krb.Test_Authentication'"
    );
    assert_eq!(host.slept(), Duration::ZERO);
}

#[tokio::test]
async fn test_kadmind_never_ready() {
    let host = ubuntu_host().with_closed_port(749);
    let err = modules::run(&host, ModuleName::IrodsTestAuthKerberos, &args())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::ServiceNotReady(_)));
    assert_eq!(host.slept(), Duration::from_secs(600));
    let lines = host.command_lines();
    assert!(!lines.iter().any(|l| l.starts_with("kinit")));
    assert!(!lines.iter().any(|l| l.contains("run_tests.py")));
    assert!(host.file("/tmp/krb5_test_cfg.json").is_none());
}

#[tokio::test]
async fn test_kerberos_on_centos7_uses_systemd() {
    let host = FakeHost::new()
        .with_os_release("CentOS Linux", "7")
        .with_file("/var/lib/irods/VERSION.json", r#"{"irods_version": "4.2.3"}"#)
        .with_file("/etc/hosts", "10.0.0.5 icat.example.org\n")
        .with_file("/etc/irods/server_config.json", r#"{"zone_name": "tempZone"}"#)
        .with_file("/pkgs/Centos linux_7/irods-auth-krb-4.2.3.rpm", "")
        .respond("klist", CommandOutput::success("Ticket cache: FILE:/tmp/krb5cc_0\n"));

    modules::run(&host, ModuleName::IrodsTestAuthKerberos, &args())
        .await
        .unwrap();

    assert!(host.file("/var/kerberos/krb5kdc/kdc.conf").unwrap().contains("kdc_ports = 88"));
    assert_eq!(host.file("/var/kerberos/krb5kdc/kadm5.acl").unwrap(), "*/admin@EXAMPLE.ORG *\n");
    let lines = host.command_lines();
    let install = "sudo yum install -y krb5-server krb5-libs krb5-auth-dialog krb5-workstation";
    assert!(lines.contains(&install.to_string()));
    assert_eq!(lines.iter().filter(|l| *l == "systemctl restart krb5kdc.service").count(), 2);
    assert!(lines.contains(&"kdb5_util create -r EXAMPLE.ORG -s -W".to_string()));
}

#[tokio::test]
async fn test_kerberos_on_suse_touches_nothing() {
    let host = FakeHost::new()
        .with_os_release("openSUSE", "13.2")
        .with_file("/var/lib/irods/VERSION.json", r#"{"irods_version": "4.2.1"}"#);
    let err = modules::run(&host, ModuleName::IrodsTestAuthKerberos, &args())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::UnsupportedPlatform(_)));
    assert!(host.commands().is_empty());
}
