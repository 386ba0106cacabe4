//! Globus GSI setup for the GSI authentication plugin tests
//!
//! Installs the Globus toolkit, issues SimpleCA-signed certificates for the
//! build account and the service account, creates proxies for both and
//! writes the client details the plugin's tests read.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::HarnessError;
use crate::host::{user_ids, CommandSpec, HostEnvironment};
use crate::platform::{PlatformIdentity, Strategy};
use crate::testing::SERVICE_ACCOUNT;

pub const TEST_CONFIG: &str = "/tmp/gsi_test_cfg.json";

/// Account the tests act as; owns the client certificate
pub const CLIENT_ACCOUNT: &str = "irodsbuild";

pub const CLIENT_HOME: &str = "/home/irodsbuild";

pub const PROXY_COPY: &str = "/tmp/irods_copy_of_irodsbuild_gsi_proxy";

const GLOBUS_REPO_URL: &str = "http://toolkit.globus.org/ftppub/gt6/installers/repo";
const DOWNLOAD_DIR: &str = "/tmp";
const SIGNED_CERTIFICATE: &str = "/tmp/gsicert";
const PRIVATE_KEY_PASSWORD: &str = "gsitest";
const CA_ACCOUNT: &str = "simpleca";

/// Contents of [`TEST_CONFIG`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsiTestConfig {
    pub client_user_proxy: String,
    #[serde(rename = "client_user_DN")]
    pub client_user_dn: String,
}

/// Name of the Globus toolkit repository package for a strategy
pub fn globus_repo_package(strategy: Strategy) -> Option<&'static str> {
    match strategy {
        Strategy::Debian => Some("globus-toolkit-repo_latest_all.deb"),
        Strategy::RedHat => Some("globus-toolkit-repo-latest.noarch.rpm"),
        Strategy::Suse => None,
    }
}

/// Verify the platform has a GSI recipe; call before changing anything
pub fn supported_strategy(identity: &PlatformIdentity) -> Result<Strategy, HarnessError> {
    identity.require(&[Strategy::RedHat, Strategy::Debian])
}

/// Fetch and install the Globus repository package, then `globus-gsi`
pub async fn install_globus(
    host: &dyn HostEnvironment,
    identity: &PlatformIdentity,
    strategy: Strategy,
) -> Result<(), HarnessError> {
    let package = globus_repo_package(strategy).ok_or_else(|| identity.unsupported())?;
    let local = PathBuf::from(DOWNLOAD_DIR).join(package);
    let url = format!("{}/{}", GLOBUS_REPO_URL, package);
    let target = local.to_string_lossy().into_owned();
    host.run_command(&CommandSpec::new("wget").args(["-O", target.as_str(), url.as_str()]))
        .await?;

    host.install_local_packages(strategy, &[local]).await?;
    host.install_packages(strategy, &["globus-gsi".to_string()])
        .await
}

/// Sign `<home>/.globus/usercert_request.pem` as the CA account
fn sign_request(account_home: &str) -> CommandSpec {
    CommandSpec::sudo(["su", "-s", "/bin/bash", "-c"])
        .arg(format!(
            "grid-ca-sign -in {}/.globus/usercert_request.pem -out {}",
            account_home, SIGNED_CERTIFICATE
        ))
        .arg(CA_ACCOUNT)
}

async fn create_client_certificate(host: &dyn HostEnvironment) -> Result<(), HarnessError> {
    let home = format!("~{}", CLIENT_ACCOUNT);
    host.run_command(&CommandSpec::as_user(
        CLIENT_ACCOUNT,
        "grid-cert-request -nopw -force -cn gsi_client_user",
    ))
    .await?;

    // the CA account has to read the request under the home directory
    host.run_command(&CommandSpec::new("chmod").args(["o+rx", CLIENT_HOME]))
        .await?;

    let key = ".globus/userkey.pem";
    host.run_command(&CommandSpec::as_user(CLIENT_ACCOUNT, format!("chmod u+w {}", key)))
        .await?;
    host.run_command(&CommandSpec::as_user(
        CLIENT_ACCOUNT,
        format!(
            "openssl rsa -in {0} -out {0} -des3 -passout pass:{1}",
            key, PRIVATE_KEY_PASSWORD
        ),
    ))
    .await?;
    host.run_command(&CommandSpec::as_user(CLIENT_ACCOUNT, format!("chmod 400 {}", key)))
        .await?;

    host.run_command(&sign_request(&home)).await?;
    host.run_command(&CommandSpec::as_user(
        CLIENT_ACCOUNT,
        format!("cp {} .globus/usercert.pem", SIGNED_CERTIFICATE),
    ))
    .await?;
    host.run_command(&CommandSpec::sudo(["rm", SIGNED_CERTIFICATE])).await?;
    Ok(())
}

async fn create_service_certificate(host: &dyn HostEnvironment) -> Result<(), HarnessError> {
    host.run_command(&CommandSpec::as_user(
        SERVICE_ACCOUNT,
        "grid-cert-request -nopw -force -cn irods_service",
    ))
    .await?;
    host.run_command(&sign_request(&format!("~{}", SERVICE_ACCOUNT)))
        .await?;
    host.run_command(&CommandSpec::as_user(
        SERVICE_ACCOUNT,
        format!("cp {} .globus/usercert.pem", SIGNED_CERTIFICATE),
    ))
    .await?;
    host.run_command(&CommandSpec::sudo(["rm", SIGNED_CERTIFICATE])).await?;
    Ok(())
}

async fn generate_proxy(
    host: &dyn HostEnvironment,
    account: &str,
    password: Option<&str>,
) -> Result<(), HarnessError> {
    let script = match password {
        Some(password) => format!("echo {} | grid-proxy-init -pwstdin", password),
        None => "grid-proxy-init".to_string(),
    };
    host.run_command(&CommandSpec::as_user(account, script)).await?;
    Ok(())
}

/// Copy the client proxy somewhere the service account may read it
async fn copy_client_proxy(host: &dyn HostEnvironment) -> Result<String, HarnessError> {
    let (uid, _) = user_ids(host, CLIENT_ACCOUNT).await?;
    let proxy = format!("/tmp/x509up_u{}", uid);
    host.run_command(&CommandSpec::sudo(["cp", proxy.as_str(), PROXY_COPY]))
        .await?;
    host.run_command(&CommandSpec::sudo([
        "chown",
        format!("{0}:{0}", SERVICE_ACCOUNT).as_str(),
        PROXY_COPY,
    ]))
    .await?;
    Ok(PROXY_COPY.to_string())
}

async fn client_distinguished_name(host: &dyn HostEnvironment) -> Result<String, HarnessError> {
    let output = host
        .run_command(&CommandSpec::as_user(CLIENT_ACCOUNT, "grid-cert-info -subject"))
        .await?;
    Ok(output.stdout.trim().to_string())
}

/// Certificates, proxies and the test configuration file
pub async fn configure_globus(host: &dyn HostEnvironment) -> Result<GsiTestConfig, HarnessError> {
    create_client_certificate(host).await?;
    create_service_certificate(host).await?;
    generate_proxy(host, CLIENT_ACCOUNT, Some(PRIVATE_KEY_PASSWORD)).await?;
    generate_proxy(host, SERVICE_ACCOUNT, None).await?;

    let config = GsiTestConfig {
        client_user_proxy: copy_client_proxy(host).await?,
        client_user_dn: client_distinguished_name(host).await?,
    };
    host.write_file(Path::new(TEST_CONFIG), &serde_json::to_string(&config)?)
        .await?;
    host.run_command(&CommandSpec::sudo(["chmod", "777", TEST_CONFIG]))
        .await?;

    info!("GSI configured for {}", config.client_user_dn);
    Ok(config)
}
