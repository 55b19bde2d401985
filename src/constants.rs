//! Application-wide constants

/// Default command timeout in seconds (30 minutes, package installs are slow)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 1800;

/// Exit code reported for a command killed by the timeout
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code reported for a command that could not be spawned
pub const NOT_FOUND_EXIT_CODE: i32 = 127;

/// Exit code of a halted pipeline
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Separator line framing every banner
pub const BANNER_SEPARATOR: &str = "--------------------------------------------------";

/// Separator between failures in a full error dump
pub const FAILURE_SEPARATOR: &str = "  ----------------------------------------------";

/// Distribution identification file
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Distribution families the installers support (apt-based)
pub const SUPPORTED_DISTRO_FAMILIES: &[&str] = &["ubuntu", "debian"];

/// Environment variable naming the non-root user that invoked sudo
pub const SUDO_USER_ENV: &str = "SUDO_USER";
