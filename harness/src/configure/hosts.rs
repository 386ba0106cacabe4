//! Text edits of `/etc/hosts` and `/etc/hosts.allow`

use std::path::Path;

use tracing::info;

use crate::errors::HarnessError;
use crate::host::HostEnvironment;

pub const ETC_HOSTS: &str = "/etc/hosts";
pub const HOSTS_ALLOW: &str = "/etc/hosts.allow";

/// Append `alias` to every line containing `needle`
pub fn append_alias(text: &str, needle: &str, alias: &str) -> String {
    let mut out = String::with_capacity(text.len() + alias.len() + 1);
    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        if body.contains(needle) {
            out.push_str(body.trim_end());
            out.push(' ');
            out.push_str(alias);
            out.push('\n');
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Append the short form of `fqdn` to the lines naming it
pub fn add_shortname(text: &str, fqdn: &str) -> String {
    let shortname = fqdn.split('.').next().unwrap_or(fqdn);
    append_alias(text, fqdn, shortname)
}

/// Drop `ALL: ... DENY` rules
pub fn remove_deny_all(text: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| {
            let body = line.trim_end_matches(['\n', '\r']);
            !(body.starts_with("ALL:") && body.ends_with("DENY"))
        })
        .collect()
}

/// Make the host resolvable by its short name
pub async fn add_shortname_to_etc_hosts(
    host: &dyn HostEnvironment,
) -> Result<(), HarnessError> {
    let fqdn = host
        .hostname()
        .ok_or_else(|| HarnessError::NotFound("host name".to_string()))?;
    edit(host, Path::new(ETC_HOSTS), |text| add_shortname(text, &fqdn)).await
}

/// Read, transform and rewrite a text file
pub async fn edit<F>(
    host: &dyn HostEnvironment,
    path: &Path,
    transform: F,
) -> Result<(), HarnessError>
where
    F: FnOnce(&str) -> String + Send,
{
    let text = host.read_file(path).await?;
    host.write_file(path, &transform(&text)).await?;
    info!("Updated {:?}", path);
    Ok(())
}
