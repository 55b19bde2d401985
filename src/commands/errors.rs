//! Step failures and the error taxonomy of a provisioning run
//!
//! A [`StepFailure`] is the structured record of one failed command or file
//! operation; it is what the banner renders. A [`StepError`] is the typed
//! result a step returns to the pipeline to halt it.

use std::path::PathBuf;
use thiserror::Error;

/// Structured record of one failed command or file operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// Human-readable description of what was attempted (first banner line)
    pub description: String,
    /// Command line that failed, empty for non-command failures
    pub command: Vec<String>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error (or the error detail for I/O failures)
    pub stderr: String,
}

impl StepFailure {
    /// Failure of an external command
    pub fn command(
        description: impl Into<String>,
        command: Vec<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            command,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Failure with no associated command (file operations, missing tools)
    pub fn detail(description: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: Vec::new(),
            stdout: String::new(),
            stderr: detail.into(),
        }
    }

    /// First line of the description
    pub fn first_line(&self) -> &str {
        self.description.lines().next().unwrap_or("")
    }

    /// Full multi-line text of the failure
    pub fn text(&self) -> String {
        if self.command.is_empty() {
            if self.stderr.is_empty() {
                return self.description.clone();
            }
            return format!("{}\n{}", self.description, self.stderr);
        }

        format!(
            "{}\nComando: {}\nSTDOUT:\n{}\nSTDERR:\n{}",
            self.description,
            self.command.join(" "),
            self.stdout,
            self.stderr
        )
    }
}

/// Raised when a rollback targets a checkpoint past the end of the sink
#[derive(Debug, Error, PartialEq, Eq)]
#[error("checkpoint {checkpoint} is past the end of the error sink (length {len})")]
pub struct CheckpointError {
    pub checkpoint: usize,
    pub len: usize,
}

/// Why a step (or the whole pipeline) stopped
#[derive(Debug, Error)]
pub enum StepError {
    /// Host is not fit for provisioning (not root, unsupported distribution)
    #[error("{0}")]
    Precondition(String),

    /// External command exited non-zero (already recorded in the sink)
    #[error("{description} (código de salida {exit_code})")]
    Command { description: String, exit_code: i32 },

    /// Every fallback candidate failed
    #[error("Ningún candidato ha funcionado: {}", labels.join(", "))]
    AllCandidatesFailed { labels: Vec<String> },

    /// File could not be read, written or removed
    #[error("{description}: {source}")]
    Io {
        description: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Required executable is not on the PATH
    #[error("{0}")]
    MissingTool(String),

    /// Delegated installer program exited non-zero
    #[error("{program} terminó con código {code}")]
    Delegated { program: String, code: i32 },

    /// Error sink misuse
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl StepError {
    /// Process exit code this error maps to
    pub fn exit_code(&self) -> i32 {
        match self {
            StepError::Delegated { code, .. } => *code,
            _ => crate::constants::FAILURE_EXIT_CODE,
        }
    }

    /// Convert into a failure record for errors not raised by the command runner
    pub fn to_failure(&self) -> StepFailure {
        match self {
            StepError::Io {
                description,
                source,
                ..
            } => StepFailure::detail(description.clone(), source.to_string()),
            other => StepFailure::detail(other.to_string(), String::new()),
        }
    }
}
