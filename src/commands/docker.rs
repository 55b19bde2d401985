//! Docker Engine and Compose plugin installation
//!
//! Steps:
//! 1. Install repository prerequisites
//! 2. Fetch the repository GPG key (HTTPS first, then HTTP)
//! 3. Register the repository and refresh the index (same fallback order)
//! 4. Install the Docker packages
//! 5. Enable the docker service
//! 6. Create the docker group and add the invoking user
//! 7. Check that docker and docker compose respond

use super::banner::{ReportStyle, Subject};
use super::common::{apt_install, apt_update, download, enable_service};
use super::errors::StepError;
use super::executor::{command_exists, CommandRunner};
use super::fallback::{try_in_order, FallbackCandidate};
use super::pipeline::{Step, StepPipeline};
use super::sink::ErrorSink;
use super::steps;
use crate::config::{DockerConfig, HostseedConfig};
use crate::constants::SUDO_USER_ENV;
use crate::system::files::{ensure_dir, mutate, set_mode, MutationPolicy};
use crate::system::{HostFacts, Precondition};
use crate::templates;

/// Name shown in the banner
pub const SUBJECT_NAME: &str = "DOCKER COMPOSE";

/// Failures are listed by their first line
pub const DEFAULT_STYLE: ReportStyle = ReportStyle::Summary;

/// Packages needed to fetch and verify the repository
const PREREQUISITES: &[&str] = &["ca-certificates", "curl", "gnupg"];

/// Build the Docker installation pipeline
pub fn pipeline(config: &HostseedConfig, runner: &CommandRunner, facts: &HostFacts) -> StepPipeline {
    let docker = config.docker.clone();
    let codename = facts
        .codename()
        .unwrap_or_else(|| docker.default_codename.clone());
    let sudo_user = std::env::var(SUDO_USER_ENV)
        .ok()
        .filter(|user| !user.is_empty());

    StepPipeline::new(Subject::installed(SUBJECT_NAME))
        .require(Precondition::RequireRoot)
        .require(Precondition::supported_distro())
        .step(step_prerequisites(runner.clone()))
        .step(step_gpg_key(runner.clone(), docker.clone()))
        .step(step_repository(runner.clone(), docker.clone(), codename))
        .step(step_packages(runner.clone(), docker.packages))
        .step(step_service(runner.clone()))
        .step(step_group(runner.clone(), sudo_user))
        .step(step_verify(runner.clone()))
}

// =============================================================================
// Installation Steps
// =============================================================================

fn step_prerequisites(runner: CommandRunner) -> Step {
    Step::new(steps::PREREQUISITES, move |sink| {
        Box::pin(install_prerequisites(runner, sink))
    })
}

async fn install_prerequisites(runner: CommandRunner, sink: &mut ErrorSink) -> Result<(), StepError> {
    apt_update(&runner, sink, "apt-get update (pre-requisitos)").await?;
    let packages: Vec<String> = PREREQUISITES.iter().map(|p| p.to_string()).collect();
    apt_install(
        &runner,
        &packages,
        &[],
        sink,
        "Instalando dependencias para el repositorio de Docker",
    )
    .await
}

fn step_gpg_key(runner: CommandRunner, docker: DockerConfig) -> Step {
    Step::new(steps::GPG_KEY, move |sink| {
        Box::pin(fetch_gpg_key(runner, docker, sink))
    })
}

async fn fetch_gpg_key(
    runner: CommandRunner,
    docker: DockerConfig,
    sink: &mut ErrorSink,
) -> Result<(), StepError> {
    if let Some(keyring_dir) = docker.keyring_path.parent() {
        ensure_dir(keyring_dir, sink)?;
    }

    let candidates = docker
        .gpg_key_urls
        .iter()
        .map(|url| download(&runner, url, &docker.keyring_path, "Descargando clave GPG de Docker"))
        .collect();
    let (source, ()) = try_in_order(candidates, sink).await?;
    tracing::info!("Docker GPG key fetched from {}", source);

    set_mode(&docker.keyring_path, 0o644, sink)
}

fn step_repository(runner: CommandRunner, docker: DockerConfig, codename: String) -> Step {
    Step::new(steps::REPOSITORY, move |sink| {
        Box::pin(configure_repository(runner, docker, codename, sink))
    })
}

/// Candidate that points the source file at `url` and refreshes the index
fn repository_candidate(
    runner: &CommandRunner,
    docker: &DockerConfig,
    codename: &str,
    url: &str,
) -> FallbackCandidate<()> {
    let runner = runner.clone();
    let policy = MutationPolicy::WriteIfDifferent {
        content: templates::docker_sources(url, codename, &docker.keyring_path),
    };
    let sources_path = docker.sources_path.clone();
    let description = format!("apt-get update (repositorio oficial Docker: {})", url);

    FallbackCandidate::new(url, move |sink| {
        Box::pin(async move {
            mutate(
                &policy,
                &sources_path,
                sink,
                "No se pudo escribir el origen del repositorio Docker",
            )?;
            apt_update(&runner, sink, &description).await
        })
    })
}

async fn configure_repository(
    runner: CommandRunner,
    docker: DockerConfig,
    codename: String,
    sink: &mut ErrorSink,
) -> Result<(), StepError> {
    let candidates = docker
        .repository_urls
        .iter()
        .map(|url| repository_candidate(&runner, &docker, &codename, url))
        .collect();
    let (source, ()) = try_in_order(candidates, sink).await?;
    tracing::info!("Docker repository configured from {}", source);
    Ok(())
}

fn step_packages(runner: CommandRunner, packages: Vec<String>) -> Step {
    Step::new(steps::PACKAGES, move |sink| {
        Box::pin(async move {
            let description = format!("Instalando paquetes Docker: {}", packages.join(" "));
            apt_install(&runner, &packages, &[], sink, &description).await
        })
    })
}

fn step_service(runner: CommandRunner) -> Step {
    Step::new(steps::SERVICE, move |sink| {
        Box::pin(async move {
            enable_service(
                &runner,
                "docker",
                sink,
                "Habilitando y arrancando el servicio docker",
            )
            .await
        })
    })
}

fn step_group(runner: CommandRunner, sudo_user: Option<String>) -> Step {
    Step::new(steps::GROUP, move |sink| {
        Box::pin(configure_group(runner, sudo_user, sink))
    })
}

async fn configure_group(
    runner: CommandRunner,
    sudo_user: Option<String>,
    sink: &mut ErrorSink,
) -> Result<(), StepError> {
    runner
        .run(
            "groupadd",
            &["-f", "docker"],
            sink,
            "Creando grupo docker (si no existía)",
        )
        .await?;

    if let Some(user) = sudo_user {
        runner
            .run(
                "usermod",
                &["-aG", "docker", &user],
                sink,
                &format!("Añadiendo usuario {} al grupo docker", user),
            )
            .await?;
    }
    Ok(())
}

fn step_verify(runner: CommandRunner) -> Step {
    Step::new(steps::VERIFY, move |sink| {
        Box::pin(verify_installation(runner, sink))
    })
}

async fn verify_installation(runner: CommandRunner, sink: &mut ErrorSink) -> Result<(), StepError> {
    if !command_exists("docker").await {
        return Err(StepError::MissingTool(
            "No se ha encontrado el binario 'docker' en el PATH.".to_string(),
        ));
    }

    runner
        .run("docker", &["--version"], sink, "Comprobando docker --version")
        .await?;
    runner
        .run(
            "docker",
            &["compose", "version"],
            sink,
            "Comprobando docker compose version",
        )
        .await?;
    Ok(())
}
