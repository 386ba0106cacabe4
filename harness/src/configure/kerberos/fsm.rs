//! Progress through the Kerberos setup sequence

use serde::{Deserialize, Serialize};

use crate::errors::HarnessError;

/// Kerberos setup state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KerberosState {
    /// Nothing done yet
    Pending,
    HostPatched,
    PackagesInstalled,
    RealmConfigured,
    KdcRestarted,
    AdminPrincipalCreated,
    AdminEnabled,
    /// Restarted after the ACL change and answering requests
    KdcRestartedAgain,
    UserPrincipalsCreated,
    KeytabCreated,
    ServiceConfigUpdated,
    ServiceRestarted,
    TicketObtained,
    TestConfigWritten,
    /// A step failed; nothing further runs
    Failed,
}

impl KerberosState {
    /// The only state reachable from this one
    pub fn next(self) -> Option<KerberosState> {
        use KerberosState::*;
        match self {
            Pending => Some(HostPatched),
            HostPatched => Some(PackagesInstalled),
            PackagesInstalled => Some(RealmConfigured),
            RealmConfigured => Some(KdcRestarted),
            KdcRestarted => Some(AdminPrincipalCreated),
            AdminPrincipalCreated => Some(AdminEnabled),
            AdminEnabled => Some(KdcRestartedAgain),
            KdcRestartedAgain => Some(UserPrincipalsCreated),
            UserPrincipalsCreated => Some(KeytabCreated),
            KeytabCreated => Some(ServiceConfigUpdated),
            ServiceConfigUpdated => Some(ServiceRestarted),
            ServiceRestarted => Some(TicketObtained),
            TicketObtained => Some(TestConfigWritten),
            TestConfigWritten | Failed => None,
        }
    }
}

/// Strictly sequential, non-retryable state machine
#[derive(Debug, Clone)]
pub struct KerberosFsm {
    state: KerberosState,
    error: Option<String>,
}

impl KerberosFsm {
    pub fn new() -> Self {
        Self {
            state: KerberosState::Pending,
            error: None,
        }
    }

    pub fn state(&self) -> KerberosState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.state == KerberosState::TestConfigWritten
    }

    /// Move to `target`, which must directly follow the current state
    pub fn advance(&mut self, target: KerberosState) -> Result<(), HarnessError> {
        if self.state.next() != Some(target) {
            return Err(HarnessError::InvalidTransition(format!(
                "{:?} -> {:?}",
                self.state, target
            )));
        }
        self.state = target;
        Ok(())
    }

    /// Record a failed step; the machine accepts no further transitions
    pub fn fail(&mut self, error: &HarnessError) {
        self.error = Some(error.to_string());
        self.state = KerberosState::Failed;
    }
}

impl Default for KerberosFsm {
    fn default() -> Self {
        Self::new()
    }
}
