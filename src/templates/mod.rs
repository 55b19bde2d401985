//! Configuration file template generators

use std::path::Path;

use crate::config::DnsConfig;

/// Label of the zone's name server record
const NAMESERVER_LABEL: &str = "ns1";

/// SOA retry interval (seconds)
const SOA_RETRY: u32 = 600;

/// SOA expire interval (seconds, two weeks)
const SOA_EXPIRE: u32 = 1_209_600;

/// Fully qualified name for a record label, the empty label being the apex
fn fqdn(label: &str, zone: &str) -> String {
    if label.is_empty() {
        format!("{}.", zone)
    } else {
        format!("{}.{}.", label, zone)
    }
}

/// Generate the master zone file
pub fn zone_file(dns: &DnsConfig) -> String {
    let apex = fqdn("", &dns.zone_name);
    let nameserver = fqdn(NAMESERVER_LABEL, &dns.zone_name);

    let records: String = dns
        .hosts
        .iter()
        .map(|label| {
            format!(
                "{name} {ttl}  IN  A   {ip}\n",
                name = fqdn(label, &dns.zone_name),
                ttl = dns.ttl,
                ip = dns.server_ip,
            )
        })
        .collect();

    format!(
        r#"$ttl {ttl}
{apex} IN  SOA {nameserver} {hostmaster} (
            {serial}
            {ttl}
            {retry}
            {expire}
            {ttl} )
{apex} IN  NS  {nameserver}
{records}"#,
        ttl = dns.ttl,
        apex = apex,
        nameserver = nameserver,
        hostmaster = dns.hostmaster,
        serial = dns.serial,
        retry = SOA_RETRY,
        expire = SOA_EXPIRE,
        records = records,
    )
}

/// Text whose presence in named.conf.local means the zone is registered
pub fn zone_marker(dns: &DnsConfig) -> String {
    format!("zone \"{}\"", dns.zone_name)
}

/// Zone declaration appended to named.conf.local
pub fn named_zone_block(dns: &DnsConfig) -> String {
    format!(
        r#"

zone "{zone}" {{
    type master;
    file "{file}";
}};
"#,
        zone = dns.zone_name,
        file = dns.zone_file.display(),
    )
}

/// deb822 source entry for the Docker repository
pub fn docker_sources(repository_url: &str, codename: &str, keyring: &Path) -> String {
    format!(
        r#"Types: deb
URIs: {url}
Suites: {codename}
Components: stable
Signed-By: {keyring}
"#,
        url = repository_url,
        codename = codename,
        keyring = keyring.display(),
    )
}
