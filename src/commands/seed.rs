//! Seed run: every installer in sequence, each in its own process
//!
//! The installers print their own banners. The seed pipeline stays quiet on
//! success and on failure reports which installer stopped the run, exiting
//! with that installer's code.

use std::path::PathBuf;

use super::banner::{ReportStyle, Subject};
use super::errors::{StepError, StepFailure};
use super::executor::run_inherit;
use super::pipeline::{Step, StepPipeline};
use super::sink::ErrorSink;

/// Subcommands run by the seed, in order
pub const INSTALLERS: &[&str] = &["docker", "webmin", "bind-install"];

/// Failures are listed by their first line
pub const DEFAULT_STYLE: ReportStyle = ReportStyle::Summary;

const FAILURE_HEADING: &str = "SCRIPT SEMILLA FINALIZADO CON ERRORES";

/// Build the seed pipeline re-invoking `exe` once per installer
///
/// `extra_args` are appended to every invocation (configuration path,
/// report style, verbosity).
pub fn pipeline(exe: PathBuf, extra_args: Vec<String>) -> StepPipeline {
    INSTALLERS.iter().fold(
        StepPipeline::new(Subject::silent_on_success(FAILURE_HEADING)),
        |pipeline, installer| pipeline.step(step_installer(exe.clone(), *installer, extra_args.clone())),
    )
}

fn step_installer(exe: PathBuf, installer: &'static str, extra_args: Vec<String>) -> Step {
    Step::new(installer, move |sink| {
        Box::pin(delegate(exe, installer, extra_args, sink))
    })
}

async fn delegate(
    exe: PathBuf,
    installer: &str,
    extra_args: Vec<String>,
    sink: &mut ErrorSink,
) -> Result<(), StepError> {
    let program = exe.to_string_lossy().to_string();
    let args: Vec<&str> = std::iter::once(installer)
        .chain(extra_args.iter().map(String::as_str))
        .collect();

    let code = run_inherit(&program, &args).await.map_err(|source| {
        sink.record(StepError::Io {
            description: format!("No se ha encontrado el programa: {}", program),
            path: exe.clone(),
            source,
        })
    })?;

    if code == 0 {
        return Ok(());
    }

    let err = StepError::Delegated {
        program: installer.to_string(),
        code,
    };
    sink.append(StepFailure::detail(err.to_string(), ""));
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::HostFacts;

    fn facts() -> HostFacts {
        HostFacts {
            euid: 1000,
            os_release: None,
            os_release_unreadable: None,
        }
    }

    /// Shell script standing in for the hostseed binary
    fn fake_installer(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-hostseed");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_step_order() {
        let pipeline = pipeline(PathBuf::from("/bin/true"), Vec::new());
        assert_eq!(pipeline.step_names(), INSTALLERS.to_vec());
    }

    #[tokio::test]
    async fn test_all_installers_succeed_silently() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls");
        let exe = fake_installer(
            dir.path(),
            &format!("echo \"$@\" >> {}\nexit 0", log.display()),
        );

        let outcome = pipeline(exe, vec!["-v".to_string()]).run(&facts()).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.banner(DEFAULT_STYLE).is_none());
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "docker -v\nwebmin -v\nbind-install -v\n"
        );
    }

    #[tokio::test]
    async fn test_failing_installer_stops_run_with_its_code() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls");
        let exe = fake_installer(
            dir.path(),
            &format!(
                "echo \"$1\" >> {}\n[ \"$1\" = webmin ] && exit 3\nexit 0",
                log.display()
            ),
        );

        let outcome = pipeline(exe, Vec::new()).run(&facts()).await;

        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "docker\nwebmin\n");

        let banner = outcome.banner(DEFAULT_STYLE).unwrap();
        assert_eq!(banner.lines()[1], FAILURE_HEADING);
        assert!(banner
            .lines()
            .iter()
            .any(|line| line == "  - webmin terminó con código 3"));
    }

    #[tokio::test]
    async fn test_missing_program_is_recorded() {
        let outcome = pipeline(PathBuf::from("/hostseed/no/such/exe"), Vec::new())
            .run(&facts())
            .await;

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.sink.len(), 1);
        assert!(outcome
            .sink
            .iter()
            .next()
            .unwrap()
            .first_line()
            .starts_with("No se ha encontrado el programa"));
    }
}
