//! Path resolution for hostseed
//!
//! Centralized directory path resolution with consistent fallback strategies.

use std::path::PathBuf;

// =============================================================================
// Path Constants
// =============================================================================

/// Hostseed data directory name (under the local data dir)
const HOSTSEED_DATA_SUBDIR: &str = "hostseed";

/// Hostseed log filename
pub const HOSTSEED_LOG_FILE: &str = "hostseed.log";

/// Configuration directory name (under the config dir)
const CONFIG_SUBDIR: &str = "hostseed";

/// Configuration filename
const CONFIG_FILE: &str = "config.toml";

// =============================================================================
// Fallback Paths
// =============================================================================

/// Fallback data directory when no local data dir is available
const FALLBACK_DATA_DIR: &str = "/tmp/hostseed";

/// Fallback configuration file when no config dir is available
const FALLBACK_CONFIG_FILE: &str = "/etc/hostseed/config.toml";

// =============================================================================
// Path Resolution Functions
// =============================================================================

/// Get the hostseed data directory path
/// Falls back to /tmp/hostseed if no local data directory is available
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(HOSTSEED_DATA_SUBDIR))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

/// Get the default configuration file path
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(CONFIG_SUBDIR).join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_contains_hostseed() {
        let path = data_dir();
        let path_str = path.to_string_lossy();
        assert!(
            path_str.contains("hostseed"),
            "Data dir should contain 'hostseed'"
        );
    }

    #[test]
    fn test_config_file_path_is_toml() {
        let path = config_file_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with(".toml"), "Config should be a TOML file");
    }

    #[test]
    fn test_constants_not_empty() {
        assert!(!HOSTSEED_DATA_SUBDIR.is_empty());
        assert!(!HOSTSEED_LOG_FILE.is_empty());
        assert!(!CONFIG_FILE.is_empty());
    }
}
