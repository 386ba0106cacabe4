//! Waiting for a freshly restarted service to answer

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::HarnessError;
use crate::host::{CommandSpec, HostEnvironment};

/// How long and how often to check a service
#[derive(Debug, Clone)]
pub struct ReadinessOptions {
    /// Service name used in logs and errors
    pub service: String,
    pub address: String,
    /// Every port must accept a connection
    pub ports: Vec<u16>,
    /// Optional command that must exit 0 once the ports are open
    pub check_command: Option<CommandSpec>,
    pub interval: Duration,
    /// Upper bound on the total wait
    pub timeout: Duration,
}

impl ReadinessOptions {
    pub fn new(service: &str, ports: &[u16]) -> Self {
        Self {
            service: service.to_string(),
            address: "localhost".to_string(),
            ports: ports.to_vec(),
            check_command: None,
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_check_command(mut self, command: CommandSpec) -> Self {
        self.check_command = Some(command);
        self
    }
}

async fn is_ready(
    host: &dyn HostEnvironment,
    options: &ReadinessOptions,
) -> Result<bool, HarnessError> {
    for &port in &options.ports {
        if !host.port_open(&options.address, port).await {
            debug!("{} port {} not accepting connections", options.service, port);
            return Ok(false);
        }
    }
    if let Some(command) = &options.check_command {
        let output = host.execute(command).await?;
        if !output.is_success() {
            debug!("{} readiness check exited with {}", options.service, output.code);
            return Ok(false);
        }
    }
    Ok(true)
}

/// Check until the service answers or the timeout elapses
pub async fn wait_until_ready(
    host: &dyn HostEnvironment,
    options: &ReadinessOptions,
) -> Result<(), HarnessError> {
    let mut waited = Duration::ZERO;
    loop {
        if is_ready(host, options).await? {
            info!("{} ready after {:?}", options.service, waited);
            return Ok(());
        }
        if waited >= options.timeout {
            warn!("{} still not ready after {:?}", options.service, waited);
            return Err(HarnessError::ServiceNotReady(format!(
                "{} did not answer within {:?}",
                options.service, options.timeout
            )));
        }
        host.sleep(options.interval).await;
        waited += options.interval;
    }
}
