//! External command execution with captured output
//!
//! Every child process has its stdout/stderr captured, never forwarded to the
//! terminal: the pipeline owns all user-visible output through its banner.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::errors::{StepError, StepFailure};
use super::sink::ErrorSink;
use crate::constants::{NOT_FOUND_EXIT_CODE, TIMEOUT_EXIT_CODE};

/// Outcome of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external commands, recording failures in an [`ErrorSink`]
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    /// Create a runner; `None` means commands may run forever
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Execute a command and capture its output (never records a failure)
    ///
    /// A command that cannot be spawned yields exit code 127 and a command
    /// killed by the timeout yields 124, so callers handle both like any
    /// other non-zero exit.
    pub async fn capture(&self, cmd: &str, args: &[&str]) -> CommandResult {
        tracing::info!("Running command: {} {:?}", cmd, args);

        let mut command = Command::new(cmd);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        let output = command.output();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, output).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Command timed out after {}s: {}", limit.as_secs(), cmd);
                    return CommandResult {
                        exit_code: TIMEOUT_EXIT_CODE,
                        stdout: String::new(),
                        stderr: format!(
                            "Tiempo de espera agotado tras {}s",
                            limit.as_secs()
                        ),
                    };
                }
            },
            None => output.await,
        };

        let result = match output {
            Ok(output) => CommandResult {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Err(e) => {
                tracing::warn!("Failed to spawn command {}: {}", cmd, e);
                CommandResult {
                    exit_code: NOT_FOUND_EXIT_CODE,
                    stdout: String::new(),
                    stderr: format!("No se pudo ejecutar '{}': {}", cmd, e),
                }
            }
        };

        tracing::info!("Command completed with exit code {}", result.exit_code);
        tracing::debug!(
            "Captured {} bytes of stdout, {} bytes of stderr",
            result.stdout.len(),
            result.stderr.len()
        );
        result
    }

    /// Execute a command; on non-zero exit record a [`StepFailure`] and fail
    pub async fn run(
        &self,
        cmd: &str,
        args: &[&str],
        sink: &mut ErrorSink,
        description: &str,
    ) -> Result<CommandResult, StepError> {
        let result = self.capture(cmd, args).await;
        if result.success() {
            return Ok(result);
        }

        let command = std::iter::once(cmd)
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect();
        sink.append(StepFailure::command(
            description,
            command,
            result.stdout.clone(),
            result.stderr.clone(),
        ));

        Err(StepError::Command {
            description: description.to_string(),
            exit_code: result.exit_code,
        })
    }
}

/// Execute a program with inherited stdio and return its exit code
pub async fn run_inherit(cmd: &str, args: &[&str]) -> std::io::Result<i32> {
    tracing::info!("Delegating to: {} {:?}", cmd, args);

    let status = Command::new(cmd).args(args).status().await?;
    let code = status.code().unwrap_or(-1);

    tracing::info!("Delegated program exited with code {}", code);
    Ok(code)
}

/// Check if a command exists
pub async fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
