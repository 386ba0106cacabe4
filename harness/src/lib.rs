//! plugtest library
//!
//! Provisioning steps for iRODS plugin test hosts: platform detection,
//! package installation, plugin builds, service configuration and test
//! invocation, plus the driver that runs them on a deployed zone.

pub mod builder;
pub mod cli;
pub mod configure;
pub mod driver;
pub mod errors;
pub mod filesys;
pub mod host;
pub mod installer;
pub mod logs;
pub mod modules;
pub mod platform;
pub mod settings;
pub mod testing;
pub mod utils;
