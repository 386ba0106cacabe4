//! Kerberos KDC provisioning for the Kerberos authentication plugin tests
//!
//! Stands up a single-host realm `EXAMPLE.ORG`, creates the test and service
//! principals, points the iRODS server at the service keytab and leaves a
//! valid ticket for `krb_user` behind.

pub mod fsm;
pub mod realm;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::configure::readiness::{wait_until_ready, ReadinessOptions};
use crate::configure::{hosts, server_config};
use crate::errors::HarnessError;
use crate::host::{CommandSpec, HostEnvironment};
use crate::platform::{PlatformIdentity, Strategy};
use crate::testing::{self, IrodsVersion, SERVICE_ACCOUNT};

pub use fsm::{KerberosFsm, KerberosState};
use realm::{PASSWORD, REALM};

pub const TEST_CONFIG: &str = "/tmp/krb5_test_cfg.json";
pub const CLIENT_USER: &str = "krb_user";
pub const SERVICE_PRINCIPAL: &str = "irods/icat.example.org";
const ADMIN_PRINCIPAL: &str = "root/admin";

const KDC_PORT: u16 = 88;
const KADMIN_PORT: u16 = 749;

/// Contents of [`TEST_CONFIG`], read by the plugin's test module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KerberosTestConfig {
    pub client_user_principal: String,
    pub client_user_ticket_cache: String,
}

/// Ticket cache named on the first line of `klist` output, e.g. "FILE:/tmp/krb5cc_0"
pub fn parse_ticket_cache(klist: &str) -> String {
    let first_line = klist.split('\n').next().unwrap_or_default();
    after_last(first_line, "Ticket cache: ").to_string()
}

/// Filesystem path of a `FILE:` ticket cache
pub fn ticket_cache_file(cache: &str) -> &str {
    after_last(cache, "FILE:")
}

fn after_last<'a>(text: &'a str, separator: &str) -> &'a str {
    text.rsplit_once(separator).map_or(text, |(_, rest)| rest)
}

fn kadmin(stdin: String) -> CommandSpec {
    CommandSpec::new("kadmin").args(["-p", ADMIN_PRINCIPAL]).stdin(stdin)
}

/// Runs the Kerberos setup one state at a time
pub struct KerberosSetup<'a> {
    host: &'a dyn HostEnvironment,
    identity: &'a PlatformIdentity,
    strategy: Strategy,
    version: IrodsVersion,
    readiness: ReadinessOptions,
    fsm: KerberosFsm,
}

impl<'a> KerberosSetup<'a> {
    /// Fails for platforms without a Kerberos recipe before anything is touched
    pub fn new(
        host: &'a dyn HostEnvironment,
        identity: &'a PlatformIdentity,
        version: IrodsVersion,
    ) -> Result<Self, HarnessError> {
        let strategy = identity.require(&[Strategy::RedHat, Strategy::Debian])?;
        realm::restart_commands(identity, strategy)?;

        let check = CommandSpec::new("kadmin").args([
            "-p",
            ADMIN_PRINCIPAL,
            "-w",
            PASSWORD,
            "-q",
            "getprinc root/admin",
        ]);
        Ok(Self {
            host,
            identity,
            strategy,
            version,
            readiness: ReadinessOptions::new("kadmind", &[KDC_PORT, KADMIN_PORT])
                .with_check_command(check),
            fsm: KerberosFsm::new(),
        })
    }

    pub fn with_readiness(mut self, readiness: ReadinessOptions) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn state(&self) -> KerberosState {
        self.fsm.state()
    }

    /// Run every step in order; the first failure ends the setup
    pub async fn run(&mut self) -> Result<KerberosTestConfig, HarnessError> {
        match self.provision().await {
            Ok(config) => Ok(config),
            Err(e) => {
                error!("Kerberos setup failed in state {:?}: {}", self.fsm.state(), e);
                self.fsm.fail(&e);
                Err(e)
            }
        }
    }

    async fn provision(&mut self) -> Result<KerberosTestConfig, HarnessError> {
        let host = self.host;

        hosts::add_shortname_to_etc_hosts(host).await?;
        self.fsm.advance(KerberosState::HostPatched)?;

        realm::install_packages(host, self.strategy).await?;
        self.fsm.advance(KerberosState::PackagesInstalled)?;

        realm::configure_realm(host, self.identity, self.strategy).await?;
        self.fsm.advance(KerberosState::RealmConfigured)?;

        realm::restart_kerberos(host, self.identity, self.strategy).await?;
        self.fsm.advance(KerberosState::KdcRestarted)?;

        let admin = CommandSpec::new("kadmin.local")
            .stdin(format!("addprinc {0}\n{1}\n{1}\n", ADMIN_PRINCIPAL, PASSWORD));
        host.run_command(&admin).await?;
        self.fsm.advance(KerberosState::AdminPrincipalCreated)?;

        realm::enable_admin_privileges(host, self.identity, self.strategy).await?;
        self.fsm.advance(KerberosState::AdminEnabled)?;

        realm::restart_kerberos(host, self.identity, self.strategy).await?;
        wait_until_ready(host, &self.readiness).await?;
        self.fsm.advance(KerberosState::KdcRestartedAgain)?;

        for principal in [CLIENT_USER, SERVICE_PRINCIPAL] {
            host.run_command(&kadmin(format!(
                "{0}\naddprinc {1}\n{0}\n{0}\n",
                PASSWORD, principal
            )))
            .await?;
        }
        self.fsm.advance(KerberosState::UserPrincipalsCreated)?;

        host.run_command(&kadmin(format!(
            "{}\nktadd -k {} {}@{}\n",
            PASSWORD,
            server_config::KERBEROS_KEYTAB,
            SERVICE_PRINCIPAL,
            REALM
        )))
        .await?;
        host.run_command(&CommandSpec::new("chown").args([
            format!("{0}:{0}", SERVICE_ACCOUNT).as_str(),
            server_config::KERBEROS_KEYTAB,
        ]))
        .await?;
        self.fsm.advance(KerberosState::KeytabCreated)?;

        server_config::patch_file(
            host,
            Path::new(server_config::SERVER_CONFIG),
            &server_config::kerberos_patch(),
        )
        .await?;
        self.fsm.advance(KerberosState::ServiceConfigUpdated)?;

        testing::restart_irods(host, self.version).await?;
        self.fsm.advance(KerberosState::ServiceRestarted)?;

        let kinit = CommandSpec::new("kinit")
            .arg(CLIENT_USER)
            .stdin(format!("{}\n", PASSWORD));
        host.run_command(&kinit).await?;
        self.fsm.advance(KerberosState::TicketObtained)?;

        let config = self.write_test_config().await?;
        self.fsm.advance(KerberosState::TestConfigWritten)?;

        info!("Kerberos ready, ticket cache {}", config.client_user_ticket_cache);
        Ok(config)
    }

    async fn write_test_config(&self) -> Result<KerberosTestConfig, HarnessError> {
        let host = self.host;
        let klist = host.run_command(&CommandSpec::new("klist")).await?;
        let config = KerberosTestConfig {
            client_user_principal: format!("{}@{}", CLIENT_USER, REALM),
            client_user_ticket_cache: parse_ticket_cache(&klist.stdout),
        };

        let text = server_config::to_config_string(&serde_json::to_value(&config)?)?;
        host.write_file(Path::new(TEST_CONFIG), &text).await?;
        host.run_command(&CommandSpec::new("chown").args([
            format!("{0}:{0}", SERVICE_ACCOUNT).as_str(),
            TEST_CONFIG,
        ]))
        .await?;

        let cache_file = ticket_cache_file(&config.client_user_ticket_cache);
        host.run_command(&CommandSpec::new("chmod").args(["o+r", cache_file]))
            .await?;
        Ok(config)
    }
}
