//! Idempotent configuration file mutations
//!
//! Every policy converges: applying it a second time reports no change and
//! leaves the file byte-for-byte identical.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::commands::errors::StepError;
use crate::commands::sink::ErrorSink;

/// How a file should be brought into its desired state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationPolicy {
    /// Append `block` unless `marker` already occurs in the file
    AppendIfAbsent { marker: String, block: String },
    /// Drop every line containing `pattern`
    FilterLinesIfPresent { pattern: String },
    /// Replace the whole file unless it already holds exactly `content`
    WriteIfDifferent { content: String },
    /// Delete the file if it exists
    RemoveIfPresent,
}

impl MutationPolicy {
    /// Apply the policy to `path`, returning whether the file changed
    pub fn apply(&self, path: &Path) -> io::Result<bool> {
        match self {
            MutationPolicy::AppendIfAbsent { marker, block } => append_if_absent(path, marker, block),
            MutationPolicy::FilterLinesIfPresent { pattern } => filter_lines(path, pattern),
            MutationPolicy::WriteIfDifferent { content } => write_if_different(path, content),
            MutationPolicy::RemoveIfPresent => remove_if_present(path),
        }
    }
}

/// Apply a policy, recording an I/O failure in the sink under `description`
pub fn mutate(
    policy: &MutationPolicy,
    path: &Path,
    sink: &mut ErrorSink,
    description: &str,
) -> Result<bool, StepError> {
    match policy.apply(path) {
        Ok(changed) => {
            tracing::info!(
                "{}: {} ({})",
                description,
                path.display(),
                if changed { "changed" } else { "unchanged" }
            );
            Ok(changed)
        }
        Err(source) => Err(sink.record(StepError::Io {
            description: format!("{}: {}", description, path.display()),
            path: path.to_path_buf(),
            source,
        })),
    }
}

/// Set the permission bits of `path`, recording a failure in the sink
pub fn set_mode(path: &Path, mode: u32, sink: &mut ErrorSink) -> Result<(), StepError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
        sink.record(StepError::Io {
            description: format!("No se pudieron cambiar los permisos de {}", path.display()),
            path: path.to_path_buf(),
            source,
        })
    })
}

/// Create a directory and its parents, recording a failure in the sink
pub fn ensure_dir(path: &Path, sink: &mut ErrorSink) -> Result<(), StepError> {
    fs::create_dir_all(path).map_err(|source| {
        sink.record(StepError::Io {
            description: format!("No se pudo crear el directorio {}", path.display()),
            path: path.to_path_buf(),
            source,
        })
    })
}

/// Read a file, treating a missing file as empty
fn read_or_empty(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn append_if_absent(path: &Path, marker: &str, block: &str) -> io::Result<bool> {
    let existing = read_or_empty(path)?;
    if existing.contains(marker) {
        return Ok(false);
    }

    create_parent(path)?;
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(block.as_bytes())?;
    Ok(true)
}

fn filter_lines(path: &Path, pattern: &str) -> io::Result<bool> {
    let original = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let filtered: String = original
        .split_inclusive('\n')
        .filter(|line| !line.contains(pattern))
        .collect();

    if filtered == original {
        return Ok(false);
    }

    fs::write(path, filtered)?;
    Ok(true)
}

fn write_if_different(path: &Path, content: &str) -> io::Result<bool> {
    match fs::read(path) {
        Ok(current) if current == content.as_bytes() => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    create_parent(path)?;
    fs::write(path, content)?;
    Ok(true)
}

fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// =============================================================================
// Best-effort operations
// =============================================================================

/// Failure kinds a best-effort operation may be allowed to absorb
pub trait ExpectedFailure: fmt::Display {
    fn is_expected(&self) -> bool;
}

/// Outcome of an operation whose expected failures are not fatal
#[derive(Debug, PartialEq, Eq)]
pub enum BestEffort<T> {
    Applied(T),
    Skipped(String),
}

impl<T> BestEffort<T> {
    /// Absorb an expected failure as `Skipped`; any other failure is returned
    pub fn absorb<E: ExpectedFailure>(result: Result<T, E>) -> Result<Self, E> {
        match result {
            Ok(value) => Ok(BestEffort::Applied(value)),
            Err(e) if e.is_expected() => {
                tracing::warn!("Best-effort operation skipped: {}", e);
                Ok(BestEffort::Skipped(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

/// Why a group ownership change did not happen
#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("el grupo '{group}' no existe")]
    GroupMissing { group: String, path: PathBuf },

    #[error("cambio de propietario denegado en {path}: {source}")]
    Refused {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no se pudo cambiar el propietario de {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExpectedFailure for OwnershipError {
    fn is_expected(&self) -> bool {
        matches!(
            self,
            OwnershipError::GroupMissing { .. } | OwnershipError::Refused { .. }
        )
    }
}

impl From<OwnershipError> for StepError {
    fn from(err: OwnershipError) -> Self {
        let (path, source) = match err {
            OwnershipError::GroupMissing { group, path } => {
                let source = io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("el grupo '{}' no existe", group),
                );
                (path, source)
            }
            OwnershipError::Refused { path, source } | OwnershipError::Io { path, source } => {
                (path, source)
            }
        };
        StepError::Io {
            description: format!("No se pudo cambiar el propietario de {}", path.display()),
            path,
            source,
        }
    }
}

/// Give `path` to root:`group`
pub fn chown_root_group(path: &Path, group: &str) -> Result<(), OwnershipError> {
    let gid = match nix::unistd::Group::from_name(group) {
        Ok(Some(entry)) => entry.gid.as_raw(),
        Ok(None) | Err(_) => {
            return Err(OwnershipError::GroupMissing {
                group: group.to_string(),
                path: path.to_path_buf(),
            })
        }
    };

    std::os::unix::fs::chown(path, Some(0), Some(gid)).map_err(|source| {
        if source.kind() == io::ErrorKind::PermissionDenied {
            OwnershipError::Refused {
                path: path.to_path_buf(),
                source,
            }
        } else {
            OwnershipError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Give `path` to root:`group` if possible; a missing group or a refused change is not fatal
pub fn set_group_best_effort(
    path: &Path,
    group: &str,
    sink: &mut ErrorSink,
) -> Result<BestEffort<()>, StepError> {
    BestEffort::absorb(chown_root_group(path, group)).map_err(|e| sink.record(e.into()))
}
