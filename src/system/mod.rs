//! System utilities

pub mod files;

use regex::Regex;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use crate::commands::errors::StepError;
use crate::constants::{OS_RELEASE_PATH, SUPPORTED_DISTRO_FAMILIES};

/// Regex to match the release codename lines of /etc/os-release.
static CODENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:UBUNTU_CODENAME|VERSION_CODENAME)=(.*)$")
        .expect("Codename regex pattern is statically validated")
});

/// Live host state the preconditions are evaluated against
#[derive(Debug, Clone)]
pub struct HostFacts {
    /// Effective user id of this process
    pub euid: u32,
    /// Contents of /etc/os-release, if present
    pub os_release: Option<String>,
    /// Why /etc/os-release exists but could not be read
    pub os_release_unreadable: Option<String>,
}

impl HostFacts {
    /// Read the facts from the running system
    pub fn probe() -> Self {
        Self::probe_with(Path::new(OS_RELEASE_PATH))
    }

    /// Probe using `os_release_path` in place of /etc/os-release
    pub fn probe_with(os_release_path: &Path) -> Self {
        let (os_release, os_release_unreadable) = match std::fs::read_to_string(os_release_path) {
            Ok(content) => (Some(content), None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, distribution unknown", os_release_path.display());
                (None, None)
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", os_release_path.display(), e);
                (None, Some(format!("No se pudo leer {}: {}", os_release_path.display(), e)))
            }
        };

        Self {
            euid: nix::unistd::geteuid().as_raw(),
            os_release,
            os_release_unreadable,
        }
    }

    pub fn is_root(&self) -> bool {
        self.euid == 0
    }

    /// Release codename (e.g. "noble"), first of UBUNTU_CODENAME / VERSION_CODENAME
    pub fn codename(&self) -> Option<String> {
        let content = self.os_release.as_deref()?;
        let caps = CODENAME_RE.captures(content)?;
        let codename = caps.get(1)?.as_str().trim().trim_matches('"').trim();
        if codename.is_empty() {
            None
        } else {
            Some(codename.to_string())
        }
    }
}

/// Gate evaluated before any step touches the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Process must run with an effective uid of 0
    RequireRoot,
    /// /etc/os-release must mention one of these families (absent file passes)
    RequireDistroFamily {
        families: BTreeSet<String>,
        /// Second sentence of the rejection message
        hint: String,
    },
}

/// Rejection hint of the apt-based installers
pub const APT_DISTRO_HINT: &str = "Este instalador está pensado para sistemas con apt.";

impl Precondition {
    /// The apt-based families every installer supports
    pub fn supported_distro() -> Self {
        Self::supported_distro_with(APT_DISTRO_HINT)
    }

    /// Same families, rejected with a caller-specific hint
    pub fn supported_distro_with(hint: &str) -> Self {
        Precondition::RequireDistroFamily {
            families: SUPPORTED_DISTRO_FAMILIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            hint: hint.to_string(),
        }
    }

    pub fn check(&self, facts: &HostFacts) -> Result<(), StepError> {
        match self {
            Precondition::RequireRoot => {
                if facts.is_root() {
                    Ok(())
                } else {
                    Err(StepError::Precondition(
                        "Este programa debe ejecutarse como root (sudo). \
                         Ejemplo: sudo hostseed seed"
                            .to_string(),
                    ))
                }
            }
            Precondition::RequireDistroFamily { families, hint } => {
                if let Some(reason) = &facts.os_release_unreadable {
                    return Err(StepError::Precondition(reason.clone()));
                }
                let Some(content) = facts.os_release.as_deref() else {
                    return Ok(());
                };
                let content = content.to_lowercase();
                if families.iter().any(|f| content.contains(&f.to_lowercase())) {
                    Ok(())
                } else {
                    Err(StepError::Precondition(format!(
                        "La distribución no parece ser Debian/Ubuntu. {}",
                        hint
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU_RELEASE: &str = r#"PRETTY_NAME="Ubuntu 24.04.1 LTS"
NAME="Ubuntu"
VERSION_ID="24.04"
VERSION_CODENAME=noble
ID=ubuntu
ID_LIKE=debian
UBUNTU_CODENAME=noble
"#;

    fn facts(euid: u32, os_release: Option<&str>) -> HostFacts {
        HostFacts {
            euid,
            os_release: os_release.map(str::to_string),
            os_release_unreadable: None,
        }
    }

    #[test]
    fn test_require_root() {
        assert!(Precondition::RequireRoot.check(&facts(0, None)).is_ok());
        let err = Precondition::RequireRoot
            .check(&facts(1000, None))
            .unwrap_err();
        assert!(matches!(err, StepError::Precondition(_)));
        assert!(err.to_string().contains("root"));
    }

    #[test]
    fn test_supported_distro_accepts_ubuntu() {
        let precondition = Precondition::supported_distro();
        assert!(precondition.check(&facts(0, Some(UBUNTU_RELEASE))).is_ok());
    }

    #[test]
    fn test_supported_distro_is_case_insensitive() {
        let precondition = Precondition::supported_distro();
        assert!(precondition
            .check(&facts(0, Some("NAME=\"Debian GNU/Linux\"")))
            .is_ok());
    }

    #[test]
    fn test_supported_distro_rejects_fedora() {
        let precondition = Precondition::supported_distro();
        let err = precondition
            .check(&facts(0, Some("NAME=\"Fedora Linux\"\nID=fedora\n")))
            .unwrap_err();
        assert!(err.to_string().contains("Debian/Ubuntu"));
    }

    #[test]
    fn test_missing_os_release_passes() {
        let precondition = Precondition::supported_distro();
        assert!(precondition.check(&facts(0, None)).is_ok());
    }

    #[test]
    fn test_unreadable_os_release_fails_distro_check() {
        let precondition = Precondition::supported_distro();
        let unreadable = HostFacts {
            euid: 0,
            os_release: None,
            os_release_unreadable: Some("No se pudo leer /etc/os-release: denegado".to_string()),
        };
        let err = precondition.check(&unreadable).unwrap_err();
        assert!(matches!(err, StepError::Precondition(_)));
        assert!(err.to_string().starts_with("No se pudo leer"));
    }

    #[test]
    fn test_probe_distinguishes_missing_from_unreadable() {
        let dir = tempfile::tempdir().unwrap();

        let missing = HostFacts::probe_with(&dir.path().join("os-release"));
        assert!(missing.os_release.is_none());
        assert!(missing.os_release_unreadable.is_none());

        // A directory exists but cannot be read as a file
        let unreadable = HostFacts::probe_with(dir.path());
        assert!(unreadable.os_release.is_none());
        assert!(unreadable.os_release_unreadable.is_some());
        assert!(Precondition::supported_distro().check(&unreadable).is_err());

        let path = dir.path().join("present");
        std::fs::write(&path, UBUNTU_RELEASE).unwrap();
        let present = HostFacts::probe_with(&path);
        assert_eq!(present.os_release.as_deref(), Some(UBUNTU_RELEASE));
        assert!(Precondition::supported_distro().check(&present).is_ok());
    }

    #[test]
    fn test_distro_rejection_uses_hint() {
        let precondition = Precondition::supported_distro_with("Pensado para BIND9.");
        let err = precondition
            .check(&facts(0, Some("ID=arch\n")))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "La distribución no parece ser Debian/Ubuntu. Pensado para BIND9."
        );
    }

    #[test]
    fn test_codename_prefers_first_match() {
        let release = "VERSION_CODENAME=\"bookworm\"\nUBUNTU_CODENAME=jammy\n";
        assert_eq!(
            facts(0, Some(release)).codename(),
            Some("bookworm".to_string())
        );
        assert_eq!(
            facts(0, Some(UBUNTU_RELEASE)).codename(),
            Some("noble".to_string())
        );
    }

    #[test]
    fn test_codename_missing_or_empty() {
        assert_eq!(facts(0, None).codename(), None);
        assert_eq!(facts(0, Some("ID=debian\n")).codename(), None);
        assert_eq!(facts(0, Some("VERSION_CODENAME=\n")).codename(), None);
    }
}
