//! curl microservice plugin tests

/// The curl microservice suite ships with the server's own tests
pub const TEST_MODULE: &str = "test_irods_microservice_plugins_curl";
