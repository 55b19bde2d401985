//! BIND DNS server installation and zone configuration
//!
//! `install_pipeline` installs bind9 and restarts whichever unit name the
//! distribution uses. `configure_pipeline` also writes the master zone,
//! registers it in named.conf.local and restarts bind9.

use super::banner::{ReportStyle, Subject};
use super::common::{apt_install, apt_update, restart_unit};
use super::errors::StepError;
use super::executor::{command_exists, CommandRunner};
use super::fallback::try_in_order;
use super::pipeline::{Step, StepPipeline};
use super::sink::ErrorSink;
use super::steps;
use crate::config::{DnsConfig, HostseedConfig};
use crate::system::files::{ensure_dir, mutate, set_group_best_effort, set_mode, BestEffort, MutationPolicy};
use crate::system::{HostFacts, Precondition};
use crate::templates;

/// Name shown in the banner
pub const SUBJECT_NAME: &str = "BIND DNS";

/// Installation failures are dumped with their captured output
pub const INSTALL_STYLE: ReportStyle = ReportStyle::Full;

/// Configuration failures are listed by their first line
pub const CONFIGURE_STYLE: ReportStyle = ReportStyle::Summary;

/// Unit names tried in order when starting after installation, with their descriptions
const SERVICE_UNITS: &[(&str, &str)] = &[
    ("bind9", "Arrancando servicio bind9"),
    ("named", "Arrancando servicio named (BIND9)"),
];

/// Rejection hint of the zone configurator
const CONFIGURE_DISTRO_HINT: &str =
    "Este configurador está pensado para sistemas con BIND9 de Debian/Ubuntu.";

/// Build the BIND installation pipeline
pub fn install_pipeline(
    _config: &HostseedConfig,
    runner: &CommandRunner,
    _facts: &HostFacts,
) -> StepPipeline {
    StepPipeline::new(Subject::installed(SUBJECT_NAME))
        .require(Precondition::RequireRoot)
        .require(Precondition::supported_distro())
        .step(step_packages(
            runner.clone(),
            "apt-get update (pre-requisitos BIND)",
            "Instalando BIND9",
        ))
        .step(step_restart_any(runner.clone()))
}

/// Build the BIND zone configuration pipeline
pub fn configure_pipeline(
    config: &HostseedConfig,
    runner: &CommandRunner,
    _facts: &HostFacts,
) -> StepPipeline {
    let dns = config.dns.clone();

    StepPipeline::new(Subject::configured(SUBJECT_NAME))
        .require(Precondition::RequireRoot)
        .require(Precondition::supported_distro_with(CONFIGURE_DISTRO_HINT))
        .step(step_packages(
            runner.clone(),
            "apt-get update (para BIND9)",
            "Instalando/verificando instalación de BIND9",
        ))
        .step(step_zone_file(dns.clone()))
        .step(step_zone_registration(dns))
        .step(step_restart_bind9(runner.clone()))
}

// =============================================================================
// Installation Steps
// =============================================================================

fn step_packages(
    runner: CommandRunner,
    update_description: &'static str,
    install_description: &'static str,
) -> Step {
    Step::new(steps::PACKAGES, move |sink| {
        Box::pin(async move {
            apt_update(&runner, sink, update_description).await?;
            let packages = vec!["bind9".to_string(), "bind9utils".to_string()];
            apt_install(&runner, &packages, &[], sink, install_description).await
        })
    })
}

fn step_restart_any(runner: CommandRunner) -> Step {
    Step::new(steps::SERVICE, move |sink| {
        Box::pin(restart_any(runner, sink))
    })
}

async fn restart_any(runner: CommandRunner, sink: &mut ErrorSink) -> Result<(), StepError> {
    if !command_exists("systemctl").await {
        tracing::warn!("systemctl not found, not restarting BIND");
        return Ok(());
    }

    let candidates = SERVICE_UNITS
        .iter()
        .map(|(unit, description)| restart_unit(&runner, unit, description))
        .collect();
    let (unit, ()) = try_in_order(candidates, sink).await?;
    tracing::info!("BIND restarted as {}", unit);
    Ok(())
}

// =============================================================================
// Configuration Steps
// =============================================================================

fn step_zone_file(dns: DnsConfig) -> Step {
    Step::new(steps::ZONE_FILE, move |sink| {
        Box::pin(async move { write_zone_file(&dns, sink) })
    })
}

/// Write the zone file, hand it to the bind group and make it world-readable
fn write_zone_file(dns: &DnsConfig, sink: &mut ErrorSink) -> Result<(), StepError> {
    if let Some(dir) = dns.zone_file.parent() {
        ensure_dir(dir, sink)?;
    }

    mutate(
        &MutationPolicy::WriteIfDifferent {
            content: templates::zone_file(dns),
        },
        &dns.zone_file,
        sink,
        "No se pudo escribir el fichero de zona",
    )?;

    if let BestEffort::Applied(()) = set_group_best_effort(&dns.zone_file, &dns.group, sink)? {
        tracing::info!("Zone file owned by root:{}", dns.group);
    }

    set_mode(&dns.zone_file, 0o644, sink)
}

fn step_zone_registration(dns: DnsConfig) -> Step {
    Step::new(steps::ZONE_REGISTRATION, move |sink| {
        Box::pin(async move { register_zone(&dns, sink) })
    })
}

fn register_zone(dns: &DnsConfig, sink: &mut ErrorSink) -> Result<(), StepError> {
    mutate(
        &MutationPolicy::AppendIfAbsent {
            marker: templates::zone_marker(dns),
            block: templates::named_zone_block(dns),
        },
        &dns.named_local,
        sink,
        "No se pudo registrar la zona",
    )?;
    Ok(())
}

fn step_restart_bind9(runner: CommandRunner) -> Step {
    Step::new(steps::SERVICE, move |sink| {
        Box::pin(restart_bind9(runner, sink))
    })
}

async fn restart_bind9(runner: CommandRunner, sink: &mut ErrorSink) -> Result<(), StepError> {
    if !command_exists("systemctl").await {
        return Err(StepError::MissingTool(
            "No se ha encontrado systemctl para reiniciar bind9.".to_string(),
        ));
    }

    runner
        .run("systemctl", &["restart", "bind9"], sink, "Reiniciando servicio bind9")
        .await?;
    Ok(())
}
