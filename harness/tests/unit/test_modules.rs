//! Module results, failures and platform gating

use serde_json::{json, Value};

use plugtest::errors::HarnessError;
use plugtest::host::fake::FakeHost;
use plugtest::host::CommandOutput;
use plugtest::modules::{self, ModuleName, ModuleResult};

fn wos_args() -> Value {
    json!({
        "plugin_root_directory": "/pkgs",
        "package_prefix": "irods-resource-plugin-wos",
        "output_directory": "/out",
    })
}

fn ubuntu_with_irods() -> FakeHost {
    FakeHost::new()
        .with_os_release("Ubuntu", "16.04")
        .with_file("/var/lib/irods/VERSION.json", r#"{"irods_version": "4.2.2"}"#)
        .with_file("/pkgs/Ubuntu_16/irods-resource-plugin-wos-4.2.2.deb", "")
}

#[tokio::test]
async fn test_wos_scenario() {
    let host = ubuntu_with_irods();
    let result = modules::run(&host, ModuleName::IrodsTestResourceWos, &wos_args())
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.exit_code(), 0);
    assert_eq!(
        host.command_lines(),
        vec![
            "sudo -E apt-get update".to_string(),
            "sudo -E apt-get install -y git".to_string(),
            "sudo dpkg -i /pkgs/Ubuntu_16/irods-resource-plugin-wos-4.2.2.deb".to_string(),
            "sudo -E apt-get install -f -y".to_string(),
            "sudo su - irods -c 'cd scripts; python run_tests.py --xml_output --run_specific_test test_irods_resource_plugin_wos'".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_package_manager_failure_stops_the_scenario() {
    let host = ubuntu_with_irods().fail_on("apt-get install -y git", 100);
    let err = modules::run(&host, ModuleName::IrodsTestResourceWos, &wos_args())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::CommandExecution { code: 100, .. }));
    let lines = host.command_lines();
    assert!(!lines.iter().any(|l| l.contains("dpkg")));
    assert!(!lines.iter().any(|l| l.contains("run_tests.py")));

    let result = ModuleResult::failed(ModuleName::IrodsTestResourceWos, &err);
    assert!(result.failed);
    assert_eq!(result.rc, Some(100));
    assert_eq!(result.exit_code(), 100);
}

#[tokio::test]
async fn test_unsupported_platforms_touch_nothing() {
    let hosts = [
        FakeHost::new().with_os_release("openSUSE", "13.2"),
        FakeHost::new(),
        FakeHost::new().with_platform("Darwin").with_os_release("Ubuntu", "16.04"),
    ];
    for host in hosts {
        let host = host.with_file("/var/lib/irods/VERSION.json", r#"{"irods_version": "4.2.2"}"#);
        let err = modules::run(&host, ModuleName::IrodsTestAuthKerberos, &json!({
            "plugin_package_root_directory": "/pkgs",
            "plugin_package_prefix": "irods-auth-krb",
            "python_test_module_to_run": "test_krb",
            "output_directory": "/out",
        }))
        .await
        .unwrap_err();

        assert!(matches!(err, HarnessError::UnsupportedPlatform(_)));
        assert!(host.commands().is_empty());
        let result = ModuleResult::failed(ModuleName::IrodsTestAuthKerberos, &err);
        assert!(result
            .msg
            .unwrap()
            .starts_with("irods_test_auth_kerberos module cannot be used on platform"));
    }
}

#[tokio::test]
async fn test_gsi_rejection_names_the_distribution() {
    let host = FakeHost::new()
        .with_os_release("openSUSE Leap", "42.3")
        .with_file("/var/lib/irods/VERSION.json", r#"{"irods_version": "4.2.2"}"#);
    let err = modules::run(&host, ModuleName::IrodsTestAuthGsi, &json!({
        "plugin_package_root_directory": "/pkgs",
        "plugin_package_prefix": "irods-auth-gsi",
        "python_test_module_to_run": "test_irods_auth_plugin_gsi",
        "output_directory": "/out",
    }))
    .await
    .unwrap_err();

    assert!(host.commands().is_empty());
    let result = ModuleResult::failed(ModuleName::IrodsTestAuthGsi, &err);
    let msg = result.msg.unwrap();
    assert!(msg.contains("Opensuse leap"), "{}", msg);
    assert!(msg.ends_with("cannot be used on platform Linux (Opensuse leap)"));
}

#[tokio::test]
async fn test_harness_exit_code_becomes_module_rc() {
    let host = FakeHost::new()
        .with_os_release("CentOS Linux", "7")
        .with_file("/var/lib/irods/VERSION.json", r#"{"irods_version": "4.2.2"}"#)
        .with_file("/pkgs/Centos linux_7/irods-resource-plugin-s3-4.2.2.rpm", "")
        .respond("run_tests.py", CommandOutput::failure(3, "FAILED (errors=1)"));
    let args = json!({
        "plugin_package_root_directory": "/pkgs",
        "plugin_package_prefix": "irods-resource-plugin-s3",
        "python_test_module_to_run": "test_irods_resource_plugin_s3",
        "output_directory": "/out",
    });

    let tmp = tempfile::tempdir().unwrap();
    let args_file = tmp.path().join("args");
    std::fs::write(&args_file, args.to_string()).unwrap();

    let result = modules::run_from_file(&host, ModuleName::IrodsTestPlugin, &args_file).await;
    assert!(result.failed);
    assert_eq!(result.exit_code(), 3);

    let line: Value = serde_json::to_value(&result).unwrap();
    assert_eq!(line["failed"], true);
    assert_eq!(line["rc"], 3);
    assert_eq!(
        host.command_lines()[0],
        "sudo yum localinstall -y --nogpgcheck '/pkgs/Centos linux_7/irods-resource-plugin-s3-4.2.2.rpm'"
    );
}

#[tokio::test]
async fn test_missing_argument_is_reported() {
    let host = ubuntu_with_irods();
    let tmp = tempfile::tempdir().unwrap();
    let args_file = tmp.path().join("args");
    std::fs::write(&args_file, r#"{"plugin_root_directory": "/pkgs"}"#).unwrap();

    let result = modules::run_from_file(&host, ModuleName::IrodsTestResourceWos, &args_file).await;
    assert!(result.failed);
    assert!(!result.changed);
    assert!(result.msg.unwrap().contains("package_prefix"));
    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_unreadable_args_file() {
    let host = FakeHost::new();
    let result = modules::run_from_file(
        &host,
        ModuleName::IrodsBuildPlugin,
        std::path::Path::new("/nonexistent/plugtest/args"),
    )
    .await;
    assert!(result.failed);
    assert_eq!(result.exit_code(), 1);
}
