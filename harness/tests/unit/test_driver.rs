//! Deploy, run, gather and destroy

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use plugtest::driver::{
    self, CommandZoneBundle, DeployRequest, DriveOptions, RemoteTask, ZoneBundle,
};
use plugtest::errors::HarnessError;
use plugtest::host::fake::FakeHost;
use plugtest::settings::{AnsibleSettings, ZoneBundleSettings};

#[derive(Default)]
struct RecordingBundle {
    calls: Mutex<Vec<String>>,
    fail_deploy: bool,
    fail_task: bool,
    hang_task: bool,
}

impl RecordingBundle {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ZoneBundle for RecordingBundle {
    async fn deploy(&self, request: &DeployRequest) -> Result<Value, HarnessError> {
        self.record("deploy");
        assert_eq!(request.version_to_packages["deployment-determined"], PathBuf::from("/irods"));
        if self.fail_deploy {
            return Err(HarnessError::ZoneBundle("deploy failed".to_string()));
        }
        Ok(json!({"zones": [{"icat_server": {"deployment_information": {"ip_address": "10.0.0.5"}}}]}))
    }

    async fn run_ansible(&self, task: &RemoteTask) -> Result<(), HarnessError> {
        self.record(&format!("run_ansible {} {}", task.module_name, task.hosts.join(",")));
        if self.hang_task {
            std::future::pending::<()>().await;
        }
        if self.fail_task {
            return Err(HarnessError::CommandExecution {
                command: "ansible".to_string(),
                code: 2,
                output_tail: String::new(),
            });
        }
        Ok(())
    }

    async fn gather(&self, deployed: &Path, output_directory: &Path) -> Result<(), HarnessError> {
        assert_eq!(deployed, Path::new("/out/deployed_zone.json"));
        assert_eq!(output_directory, Path::new("/out"));
        self.record("gather");
        Ok(())
    }

    async fn destroy(&self, _deployed: &Path) -> Result<(), HarnessError> {
        self.record("destroy");
        Ok(())
    }
}

fn options() -> DriveOptions {
    DriveOptions {
        zone_bundle_input: PathBuf::from("/in/zone.json"),
        deployment_name: "krb-test".to_string(),
        irods_core_packages_root_directory: PathBuf::from("/irods"),
        plugin_package_root_directory: PathBuf::from("/pkgs"),
        plugin_package_prefix: "irods-auth-krb".to_string(),
        ansible_module_to_run: "irods_test_auth_kerberos".to_string(),
        python_test_module_to_run: "test_krb".to_string(),
        output_directory: PathBuf::from("/out"),
        version_key: "deployment-determined".to_string(),
    }
}

fn never() -> impl Future<Output = ()> + Send {
    std::future::pending()
}

fn host() -> FakeHost {
    FakeHost::new().with_file("/in/zone.json", r#"{"zones": [{"icat_server": {}}]}"#)
}

#[tokio::test]
async fn test_successful_run() {
    let host = host();
    let bundle = RecordingBundle::default();
    let outcome = driver::drive(&host, &bundle, &options(), never()).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        bundle.calls(),
        vec!["deploy", "run_ansible irods_test_auth_kerberos 10.0.0.5", "gather", "destroy"]
    );
}

#[tokio::test]
async fn test_failed_task_still_cleans_up() {
    let host = host();
    let bundle = RecordingBundle {
        fail_task: true,
        ..Default::default()
    };
    let outcome = driver::drive(&host, &bundle, &options(), never()).await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(bundle.calls()[2..], ["gather", "destroy"]);
}

#[tokio::test]
async fn test_signal_during_task_still_cleans_up() {
    let host = host();
    let bundle = RecordingBundle {
        hang_task: true,
        ..Default::default()
    };
    let outcome = driver::drive(&host, &bundle, &options(), std::future::ready(()))
        .await
        .unwrap();

    assert!(outcome.task.is_err());
    assert!(outcome.gather.is_ok());
    assert!(outcome.destroy.is_ok());
    let calls = bundle.calls();
    assert_eq!(calls[calls.len() - 2..], ["gather", "destroy"]);
}

#[tokio::test]
async fn test_failed_deploy_has_nothing_to_clean_up() {
    let host = host();
    let bundle = RecordingBundle {
        fail_deploy: true,
        ..Default::default()
    };
    let err = driver::drive(&host, &bundle, &options(), never()).await.unwrap_err();

    assert!(matches!(err, HarnessError::ZoneBundle(_)));
    assert_eq!(bundle.calls(), vec!["deploy"]);
}

#[tokio::test]
async fn test_malformed_zone_bundle_input() {
    let host = FakeHost::new().with_file("/in/zone.json", "{ zones");
    let bundle = RecordingBundle::default();
    let err = driver::drive(&host, &bundle, &options(), never()).await.unwrap_err();

    assert!(matches!(err, HarnessError::ConfigParse { .. }));
    assert!(bundle.calls().is_empty());
}

#[tokio::test]
async fn test_command_bundle_forwards_ansible_failure() {
    let host = host()
        .with_file(
            "/out/deployed_zone.json",
            r#"{"zones": [{"icat_server": {"deployment_information": {"ip_address": "10.0.0.5"}}}]}"#,
        )
        .fail_on("ansible all", 2);
    let bundle = CommandZoneBundle::new(
        &host,
        ZoneBundleSettings::default(),
        AnsibleSettings::default(),
        PathBuf::from("/out/modules"),
    );

    let outcome = driver::drive(&host, &bundle, &options(), never()).await.unwrap();

    assert_eq!(outcome.exit_code(), 2);
    let lines = host.command_lines();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("irods_testing_zone_bundle deploy"));
    assert!(lines[1].starts_with("ansible all -i 10.0.0.5, -u irodsbuild --become"));
    assert_eq!(
        lines[2],
        "irods_testing_zone_bundle gather --deployed-zone-bundle /out/deployed_zone.json --output-directory /out"
    );
    assert_eq!(
        lines[3],
        "irods_testing_zone_bundle destroy --deployed-zone-bundle /out/deployed_zone.json"
    );
}
