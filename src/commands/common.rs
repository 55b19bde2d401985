//! Operations shared by the installers (apt, systemd, downloads)

use std::path::Path;

use super::errors::StepError;
use super::executor::{command_exists, CommandRunner};
use super::fallback::FallbackCandidate;
use super::sink::ErrorSink;

/// Refresh the package index
pub async fn apt_update(
    runner: &CommandRunner,
    sink: &mut ErrorSink,
    description: &str,
) -> Result<(), StepError> {
    runner.run("apt-get", &["update"], sink, description).await?;
    Ok(())
}

/// Install packages non-interactively
pub async fn apt_install(
    runner: &CommandRunner,
    packages: &[String],
    extra_flags: &[&str],
    sink: &mut ErrorSink,
    description: &str,
) -> Result<(), StepError> {
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(extra_flags);
    args.extend(packages.iter().map(String::as_str));

    runner.run("apt-get", &args, sink, description).await?;
    Ok(())
}

/// Enable and start a unit, skipped on hosts without systemd
pub async fn enable_service(
    runner: &CommandRunner,
    unit: &str,
    sink: &mut ErrorSink,
    description: &str,
) -> Result<(), StepError> {
    if !command_exists("systemctl").await {
        tracing::warn!("systemctl not found, not enabling {}", unit);
        return Ok(());
    }

    runner
        .run("systemctl", &["enable", "--now", unit], sink, description)
        .await?;
    Ok(())
}

/// Fallback candidate that downloads `url` to `dest` with curl
pub fn download(
    runner: &CommandRunner,
    url: &str,
    dest: &Path,
    what: &str,
) -> FallbackCandidate<()> {
    let runner = runner.clone();
    let url = url.to_string();
    let dest = dest.to_string_lossy().to_string();
    let description = format!("{} ({})", what, url);

    FallbackCandidate::new(url.clone(), move |sink| {
        Box::pin(async move {
            runner
                .run("curl", &["-fsSL", &url, "-o", &dest], sink, &description)
                .await
                .map(|_| ())
        })
    })
}

/// Fallback candidate that restarts one systemd unit
pub fn restart_unit(runner: &CommandRunner, unit: &str, description: &str) -> FallbackCandidate<()> {
    let runner = runner.clone();
    let unit = unit.to_string();
    let description = description.to_string();

    FallbackCandidate::new(unit.clone(), move |sink| {
        Box::pin(async move {
            runner
                .run("systemctl", &["restart", &unit], sink, &description)
                .await
                .map(|_| ())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fallback::try_in_order;

    #[tokio::test]
    async fn test_download_from_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("gpg");
        std::fs::write(&source, "KEY").unwrap();
        let dest = dir.path().join("docker.asc");

        if !command_exists("curl").await {
            return;
        }

        let runner = CommandRunner::default();
        let mut sink = ErrorSink::new();
        let url = format!("file://{}", source.display());
        let candidates = vec![
            download(&runner, "file:///hostseed/no/such/key", &dest, "Descargando clave"),
            download(&runner, &url, &dest, "Descargando clave"),
        ];

        let (label, ()) = try_in_order(candidates, &mut sink).await.unwrap();
        assert_eq!(label, url);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "KEY");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_download_failure_records_curl_invocation() {
        if !command_exists("curl").await {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::default();
        let mut sink = ErrorSink::new();
        let candidates = vec![download(
            &runner,
            "file:///hostseed/no/such/key",
            &dir.path().join("out"),
            "Descargando clave GPG de Docker",
        )];

        let err = try_in_order(candidates, &mut sink).await.unwrap_err();
        assert!(matches!(err, StepError::AllCandidatesFailed { .. }));
        let failure = sink.iter().next().unwrap();
        assert_eq!(failure.command[0], "curl");
        assert!(failure
            .first_line()
            .starts_with("Descargando clave GPG de Docker (file:///hostseed"));
    }
}
