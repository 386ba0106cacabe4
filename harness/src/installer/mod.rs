//! OS package installation

pub mod packages;
