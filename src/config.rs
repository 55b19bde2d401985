//! Configuration file support for hostseed
//!
//! Loads configuration from TOML file at ~/.config/hostseed/config.toml
//! (or the path given with `--config`).
//! Falls back to defaults if the file doesn't exist or can't be parsed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::paths;

/// Hostseed configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostseedConfig {
    /// External command settings
    pub commands: CommandsConfig,

    /// Docker Engine installer settings
    pub docker: DockerConfig,

    /// Webmin installer settings
    pub webmin: WebminConfig,

    /// BIND9 zone settings
    pub dns: DnsConfig,
}

/// External command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Per-command timeout (seconds), 0 disables it
    pub timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: constants::DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl CommandsConfig {
    /// Timeout as a Duration, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Docker repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// GPG key locations, tried in order
    pub gpg_key_urls: Vec<String>,

    /// Repository base URIs, tried in order
    pub repository_urls: Vec<String>,

    /// Where the downloaded key is stored
    pub keyring_path: PathBuf,

    /// deb822 source file for the repository
    pub sources_path: PathBuf,

    /// Suite used when /etc/os-release has no codename
    pub default_codename: String,

    /// Packages installed from the repository
    pub packages: Vec<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            gpg_key_urls: vec![
                "https://download.docker.com/linux/ubuntu/gpg".to_string(),
                "http://download.docker.com/linux/ubuntu/gpg".to_string(),
            ],
            repository_urls: vec![
                "https://download.docker.com/linux/ubuntu".to_string(),
                "http://download.docker.com/linux/ubuntu".to_string(),
            ],
            keyring_path: PathBuf::from("/etc/apt/keyrings/docker.asc"),
            sources_path: PathBuf::from("/etc/apt/sources.list.d/docker.sources"),
            default_codename: "noble".to_string(),
            packages: [
                "docker-ce",
                "docker-ce-cli",
                "containerd.io",
                "docker-buildx-plugin",
                "docker-compose-plugin",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Webmin repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebminConfig {
    /// Old source list signed with the deprecated DSA key
    pub legacy_list_path: PathBuf,

    /// Main apt source list, cleaned of legacy entries
    pub main_sources_path: PathBuf,

    /// Substring identifying legacy Webmin entries
    pub legacy_marker: String,

    /// Repository setup script locations, tried in order
    pub setup_script_urls: Vec<String>,

    /// Where the setup script is downloaded
    pub setup_script_path: PathBuf,

    /// Packages needed before the setup script can run
    pub dependencies: Vec<String>,
}

impl Default for WebminConfig {
    fn default() -> Self {
        Self {
            legacy_list_path: PathBuf::from("/etc/apt/sources.list.d/webmin.list"),
            main_sources_path: PathBuf::from("/etc/apt/sources.list"),
            legacy_marker: "webmin.com".to_string(),
            setup_script_urls: vec![
                "https://raw.githubusercontent.com/webmin/webmin/master/webmin-setup-repo.sh"
                    .to_string(),
            ],
            setup_script_path: PathBuf::from("/tmp/webmin-setup-repo.sh"),
            dependencies: [
                "curl",
                "ca-certificates",
                "gnupg",
                "software-properties-common",
                "apt-transport-https",
                "wget",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// BIND9 master zone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Address published in every A record
    pub server_ip: String,

    /// Zone origin without the trailing dot
    pub zone_name: String,

    /// Zone file written by the configurator
    pub zone_file: PathBuf,

    /// Local BIND configuration the zone is registered in
    pub named_local: PathBuf,

    /// Responsible mailbox in SOA form (dots, trailing dot)
    pub hostmaster: String,

    /// SOA serial
    pub serial: u64,

    /// Default TTL and record TTL (seconds)
    pub ttl: u32,

    /// Record labels, empty string is the zone apex
    pub hosts: Vec<String>,

    /// Group that should own the zone file
    pub group: String,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            server_ip: "192.168.1.149".to_string(),
            zone_name: "livingspace.sdslab.cat".to_string(),
            zone_file: PathBuf::from("/var/lib/bind/livingspace.sdslab.cat.hosts"),
            named_local: PathBuf::from("/etc/bind/named.conf.local"),
            hostmaster: "grupo3.sarria.salesians.cat.".to_string(),
            serial: 2025102906,
            ttl: 60,
            hosts: ["", "ns1", "www", "kuma"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            group: "bind".to_string(),
        }
    }
}

impl HostseedConfig {
    /// Load configuration from file, or return defaults if not found
    pub fn load(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(paths::config_file_path);

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    Self::validated(config)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Replace values that would make a step destructive with their defaults
    fn validated(mut config: Self) -> Self {
        // An empty marker matches every line of the main sources list
        if config.webmin.legacy_marker.trim().is_empty() {
            tracing::warn!("webmin.legacy_marker is empty, using the default");
            config.webmin.legacy_marker = WebminConfig::default().legacy_marker;
        }
        config
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostseedConfig::default();
        assert_eq!(config.commands.timeout_secs, 1800);
        assert_eq!(config.docker.default_codename, "noble");
        assert_eq!(config.docker.packages.len(), 5);
        assert_eq!(config.webmin.legacy_marker, "webmin.com");
        assert_eq!(config.dns.zone_name, "livingspace.sdslab.cat");
        assert_eq!(config.dns.hosts.len(), 4);
    }

    #[test]
    fn test_fallback_urls_prefer_https() {
        let config = DockerConfig::default();
        assert!(config.gpg_key_urls[0].starts_with("https://"));
        assert!(config.gpg_key_urls[1].starts_with("http://"));
        assert!(config.repository_urls[0].starts_with("https://"));
    }

    #[test]
    fn test_timeout_disabled_with_zero() {
        let config = CommandsConfig { timeout_secs: 0 };
        assert!(config.timeout().is_none());

        let config = CommandsConfig { timeout_secs: 5 };
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_partial_config_parsing() {
        let toml_str = r#"
[dns]
server_ip = "10.0.0.53"
"#;
        let config: HostseedConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dns.server_ip, "10.0.0.53");
        // Other values should be defaults
        assert_eq!(config.dns.zone_name, "livingspace.sdslab.cat");
        assert_eq!(config.commands.timeout_secs, 1800);
    }

    #[test]
    fn test_to_toml_is_valid() {
        let rendered = HostseedConfig::default().to_toml();
        assert!(!rendered.is_empty());
        let parsed: HostseedConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.dns.serial, 2025102906);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostseedConfig::load(Some(&dir.path().join("absent.toml")));
        assert_eq!(config.dns.group, "bind");
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[dns\nserver_ip = ").unwrap();
        let config = HostseedConfig::load(Some(&path));
        assert_eq!(config.dns.server_ip, "192.168.1.149");
    }

    #[test]
    fn test_load_rejects_empty_legacy_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostseed.toml");
        std::fs::write(
            &path,
            "[webmin]\nlegacy_marker = \"\"\nsetup_script_path = \"/opt/setup.sh\"\n",
        )
        .unwrap();
        let config = HostseedConfig::load(Some(&path));
        assert_eq!(config.webmin.legacy_marker, "webmin.com");
        assert_eq!(config.webmin.setup_script_path, PathBuf::from("/opt/setup.sh"));
    }
}
