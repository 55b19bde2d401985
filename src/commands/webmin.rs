//! Webmin installation from the official repository
//!
//! Steps:
//! 1. Drop legacy Webmin sources signed with the deprecated DSA key
//! 2. Refresh the index and install the setup script's dependencies
//! 3. Download and run the official repository setup script
//! 4. Install Webmin
//! 5. Enable the webmin service

use super::banner::{ReportStyle, Subject};
use super::common::{apt_install, apt_update, download, enable_service};
use super::errors::StepError;
use super::executor::CommandRunner;
use super::fallback::try_in_order;
use super::pipeline::{Step, StepPipeline};
use super::sink::ErrorSink;
use super::steps;
use crate::config::{HostseedConfig, WebminConfig};
use crate::system::files::{mutate, set_mode, MutationPolicy};
use crate::system::{HostFacts, Precondition};

/// Name shown in the banner
pub const SUBJECT_NAME: &str = "WEBMIN";

/// Failures are dumped with their captured output
pub const DEFAULT_STYLE: ReportStyle = ReportStyle::Full;

/// Build the Webmin installation pipeline
pub fn pipeline(config: &HostseedConfig, runner: &CommandRunner, _facts: &HostFacts) -> StepPipeline {
    let webmin = config.webmin.clone();

    StepPipeline::new(Subject::installed(SUBJECT_NAME))
        .require(Precondition::RequireRoot)
        .require(Precondition::supported_distro())
        .step(step_legacy_sources(webmin.clone()))
        .step(step_prerequisites(runner.clone(), webmin.dependencies.clone()))
        .step(step_setup_script(runner.clone(), webmin))
        .step(step_packages(runner.clone()))
        .step(step_service(runner.clone()))
}

fn step_legacy_sources(webmin: WebminConfig) -> Step {
    Step::new(steps::LEGACY_SOURCES, move |sink| {
        Box::pin(async move { remove_legacy_sources(&webmin, sink) })
    })
}

fn remove_legacy_sources(webmin: &WebminConfig, sink: &mut ErrorSink) -> Result<(), StepError> {
    mutate(
        &MutationPolicy::RemoveIfPresent,
        &webmin.legacy_list_path,
        sink,
        "No se pudo eliminar",
    )?;
    mutate(
        &MutationPolicy::FilterLinesIfPresent {
            pattern: webmin.legacy_marker.clone(),
        },
        &webmin.main_sources_path,
        sink,
        "No se pudo limpiar",
    )?;
    Ok(())
}

fn step_prerequisites(runner: CommandRunner, dependencies: Vec<String>) -> Step {
    Step::new(steps::PREREQUISITES, move |sink| {
        Box::pin(async move {
            apt_update(&runner, sink, "apt-get update (pre-requisitos Webmin)").await?;
            apt_install(
                &runner,
                &dependencies,
                &[],
                sink,
                "Instalando dependencias para Webmin",
            )
            .await
        })
    })
}

fn step_setup_script(runner: CommandRunner, webmin: WebminConfig) -> Step {
    Step::new(steps::SETUP_SCRIPT, move |sink| {
        Box::pin(run_setup_script(runner, webmin, sink))
    })
}

async fn run_setup_script(
    runner: CommandRunner,
    webmin: WebminConfig,
    sink: &mut ErrorSink,
) -> Result<(), StepError> {
    let script = &webmin.setup_script_path;
    let candidates = webmin
        .setup_script_urls
        .iter()
        .map(|url| download(&runner, url, script, "Descargando webmin-setup-repo.sh"))
        .collect();
    let (source, ()) = try_in_order(candidates, sink).await?;
    tracing::info!("Webmin setup script fetched from {}", source);

    set_mode(script, 0o755, sink)?;

    let script = script.to_string_lossy();
    runner
        .run(
            &script,
            &["--force", "--stable"],
            sink,
            "Configurando repositorio oficial de Webmin (webmin-setup-repo.sh)",
        )
        .await?;
    Ok(())
}

fn step_packages(runner: CommandRunner) -> Step {
    Step::new(steps::PACKAGES, move |sink| {
        Box::pin(async move {
            apt_install(
                &runner,
                &["webmin".to_string()],
                &["--install-recommends"],
                sink,
                "Instalando Webmin",
            )
            .await
        })
    })
}

fn step_service(runner: CommandRunner) -> Step {
    Step::new(steps::SERVICE, move |sink| {
        Box::pin(async move {
            enable_service(
                &runner,
                "webmin",
                sink,
                "Habilitando y arrancando servicio webmin",
            )
            .await
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_step_order() {
        let facts = HostFacts {
            euid: 0,
            os_release: None,
            os_release_unreadable: None,
        };
        let pipeline = pipeline(&HostseedConfig::default(), &CommandRunner::default(), &facts);
        assert_eq!(
            pipeline.step_names(),
            vec![
                steps::LEGACY_SOURCES,
                steps::PREREQUISITES,
                steps::SETUP_SCRIPT,
                steps::PACKAGES,
                steps::SERVICE,
            ]
        );
    }

    #[test]
    fn test_remove_legacy_sources() {
        let dir = tempfile::tempdir().unwrap();
        let webmin = WebminConfig {
            legacy_list_path: dir.path().join("webmin.list"),
            main_sources_path: dir.path().join("sources.list"),
            ..WebminConfig::default()
        };
        std::fs::write(&webmin.legacy_list_path, "deb https://download.webmin.com/download/repository sarge contrib\n").unwrap();
        std::fs::write(
            &webmin.main_sources_path,
            "deb http://archive.ubuntu.com/ubuntu noble main\n\
             deb https://download.webmin.com/download/repository sarge contrib\n",
        )
        .unwrap();
        let mut sink = ErrorSink::new();

        remove_legacy_sources(&webmin, &mut sink).unwrap();
        assert!(!webmin.legacy_list_path.exists());
        assert_eq!(
            std::fs::read_to_string(&webmin.main_sources_path).unwrap(),
            "deb http://archive.ubuntu.com/ubuntu noble main\n"
        );

        // Converged: running again changes nothing and records nothing
        remove_legacy_sources(&webmin, &mut sink).unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_remove_legacy_sources_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let webmin = WebminConfig {
            legacy_list_path: dir.path().join("webmin.list"),
            main_sources_path: dir.path().join("sources.list"),
            ..WebminConfig::default()
        };
        let mut sink = ErrorSink::new();
        remove_legacy_sources(&webmin, &mut sink).unwrap();
        assert!(!webmin.main_sources_path.exists());
    }
}
