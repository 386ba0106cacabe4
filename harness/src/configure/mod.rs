//! Service configuration for the plugin test scenarios
//!
//! Every configurator edits existing host files field by field or line by
//! line and runs commands through the [`crate::host::HostEnvironment`]; any
//! failing step ends the scenario.

pub mod curl;
pub mod gsi;
pub mod hosts;
pub mod hpss;
pub mod kerberos;
pub mod readiness;
pub mod server_config;
pub mod wos;
