//! Integration tests against the in-memory host

mod test_build;
mod test_driver;
mod test_kerberos;
mod test_modules;
