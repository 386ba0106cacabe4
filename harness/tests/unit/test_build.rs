//! Source builds on a simulated CentOS 7 host

use std::path::Path;

use serde_json::{json, Value};

use plugtest::errors::HarnessError;
use plugtest::host::fake::FakeHost;
use plugtest::host::HostEnvironment;
use plugtest::modules::{self, ModuleName};

const WORK_DIR: &str = "/home/irodsbuild/irods_build_local_plugin_dir";

fn centos7() -> FakeHost {
    FakeHost::new()
        .with_os_release("CentOS Linux", "7")
        .with_file("/irods_pkgs/Centos linux_7/irods-dev-4.2.2-centos7-x86_64.rpm", "")
        .with_file("/irods_pkgs/Centos linux_7/irods-runtime-4.2.2-centos7-x86_64.rpm", "")
}

fn args() -> Value {
    json!({
        "output_root_directory": "/out",
        "irods_packages_root_directory": "/irods_pkgs",
        "git_repository": "https://github.com/irods/irods_auth_plugin_krb",
        "git_commitish": "4-2-stable",
        "debug_build": "False",
    })
}

#[tokio::test]
async fn test_build_on_centos7() {
    let host = centos7();
    let result = modules::run(&host, ModuleName::IrodsBuildPlugin, &args())
        .await
        .unwrap();

    assert_eq!(result.irods_platform_string.as_deref(), Some("Centos linux_7"));
    assert_eq!(result.complex_args.unwrap()["debug_build"], false);
    assert!(host.exists(Path::new("/out/Centos linux_7")).await);

    let lines = host.command_lines();
    assert!(lines[0].starts_with("sudo yum install -y python-devel help2man"));
    assert_eq!(
        lines[1],
        "sudo yum localinstall -y --nogpgcheck \
         '/irods_pkgs/Centos linux_7/irods-dev-4.2.2-centos7-x86_64.rpm'"
    );
    assert!(lines[2].contains("irods-runtime-4.2.2"));
    assert!(lines.contains(&"sudo ln -s /hpss_src/hpss-7.4.3.2-0.el6 /opt/hpss".to_string()));

    let clone = lines.iter().position(|l| l.starts_with("git clone --recursive")).unwrap();
    assert_eq!(lines[clone + 1], "git checkout 4-2-stable");
    let build = host.commands().pop().unwrap();
    assert_eq!(build.cwd.as_deref(), Some(Path::new(WORK_DIR)));
    assert!(build.args.last().unwrap().starts_with("./packaging/build.sh -r "));
}

#[tokio::test]
async fn test_failed_build_copies_nothing() {
    let host = centos7().fail_on("packaging/build.sh", 2);
    let err = modules::run(&host, ModuleName::IrodsBuildPlugin, &args())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::CommandExecution { code: 2, .. }));
    assert!(!host.exists(Path::new("/out/Centos linux_7")).await);
}

#[tokio::test]
async fn test_existing_checkout_is_refused() {
    let host = centos7().with_dir(WORK_DIR);
    let err = modules::run(&host, ModuleName::IrodsBuildPlugin, &args())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::InvalidArguments(_)));
    assert!(!host.command_lines().iter().any(|l| l.starts_with("git")));
}

#[tokio::test]
async fn test_missing_irods_dev_package() {
    let host = FakeHost::new()
        .with_os_release("CentOS Linux", "7")
        .with_file("/irods_pkgs/Centos linux_7/irods-runtime-4.2.2-centos7-x86_64.rpm", "");
    let err = modules::run(&host, ModuleName::IrodsBuildPlugin, &args())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::PluginPackageNotFound { .. }));
    assert!(!host.command_lines().iter().any(|l| l.contains("localinstall")));
}

#[tokio::test]
async fn test_clone_failure_stops_the_build() {
    let host = centos7().fail_on("git clone", 128);
    let err = modules::run(&host, ModuleName::IrodsBuildPlugin, &args())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::CommandExecution { code: 128, .. }));
    let lines = host.command_lines();
    assert!(lines.last().unwrap().starts_with("git clone --recursive"));
    assert!(!lines.iter().any(|l| l.starts_with("git checkout")));
    assert!(!lines.iter().any(|l| l.contains("packaging/build.sh")));
}

#[tokio::test]
async fn test_checkout_failure_stops_the_build() {
    let host = centos7().fail_on("git checkout", 1);
    let err = modules::run(&host, ModuleName::IrodsBuildPlugin, &args())
        .await
        .unwrap_err();

    match err {
        HarnessError::CommandExecution { command, code, .. } => {
            assert_eq!(command, "git checkout 4-2-stable");
            assert_eq!(code, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!host.command_lines().iter().any(|l| l.contains("packaging/build.sh")));
    assert!(!host.exists(Path::new("/out/Centos linux_7")).await);
}
