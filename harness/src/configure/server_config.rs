//! Field-level patching of the iRODS `server_config.json`

use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::info;

use crate::errors::HarnessError;
use crate::host::HostEnvironment;

pub const SERVER_CONFIG: &str = "/etc/irods/server_config.json";

pub const KERBEROS_SERVICE_PRINCIPAL: &str = "irods/icat.example.org@EXAMPLE.ORG";
pub const KERBEROS_KEYTAB: &str = "/var/lib/irods/irods.keytab";
pub const TIRPC_LIBRARY: &str = "/lib64/libtirpc.so";

/// Merge `patch` into `doc`.
///
/// Objects merge key by key, recursively; any other patch value replaces
/// the existing one. Keys absent from the patch are left untouched.
pub fn merge(doc: &mut Value, patch: &Value) {
    match (doc, patch) {
        (Value::Object(doc), Value::Object(patch)) => {
            for (key, value) in patch {
                let nested = value.is_object() && doc.get(key).is_some_and(Value::is_object);
                if nested {
                    if let Some(existing) = doc.get_mut(key) {
                        merge(existing, value);
                    }
                } else {
                    doc.insert(key.clone(), value.clone());
                }
            }
        }
        (doc, patch) => *doc = patch.clone(),
    }
}

/// Keys enabling Kerberos authentication on the server
pub fn kerberos_patch() -> Value {
    json!({
        "KerberosServicePrincipal": KERBEROS_SERVICE_PRINCIPAL,
        // The server reads the keytab from KRB5_KTNAME; this key is informational
        "KerberosKeytab": KERBEROS_KEYTAB,
        "environment_variables": {
            "KRB5_KTNAME": KERBEROS_KEYTAB,
        },
    })
}

/// Preload libtirpc for the HPSS client
pub fn ld_preload_patch() -> Value {
    json!({
        "environment_variables": {
            "LD_PRELOAD": TIRPC_LIBRARY,
        },
    })
}

/// Serialize with four-space indentation and sorted keys
pub fn to_config_string(value: &Value) -> Result<String, HarnessError> {
    let sorted = sort_keys(value);
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(&sorted, &mut serializer)?;
    String::from_utf8(out).map_err(|e| HarnessError::ConfigError(e.to_string()))
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Read `path`, merge `patch` into it and write it back
pub async fn patch_file(
    host: &dyn HostEnvironment,
    path: &Path,
    patch: &Value,
) -> Result<Value, HarnessError> {
    let text = host.read_file(path).await?;
    let mut doc: Value = serde_json::from_str(&text).map_err(|source| HarnessError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    if !doc.is_object() {
        return Err(HarnessError::ConfigError(format!(
            "{} does not hold a JSON object",
            path.display()
        )));
    }

    merge(&mut doc, patch);
    host.write_file(path, &to_config_string(&doc)?).await?;
    info!("Updated {:?}", path);
    Ok(doc)
}
