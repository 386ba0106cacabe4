//! Filesystem helpers used by the local host

pub mod dir;
pub mod file;
