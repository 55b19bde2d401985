//! Hostseed - provisioning for the SDS Lab Debian/Ubuntu hosts

mod commands;
mod config;
mod constants;
mod paths;
mod system;
mod templates;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::banner::ReportStyle;
use commands::executor::CommandRunner;
use commands::pipeline::StepPipeline;
use commands::{bind, docker, seed, webmin};
use config::HostseedConfig;
use constants::FAILURE_EXIT_CODE;
use system::HostFacts;

/// Host provisioning for Docker, Webmin and BIND
#[derive(Parser)]
#[command(name = "hostseed")]
#[command(author = "SDS Lab")]
#[command(version = "1.0.0")]
#[command(about = "Idempotent provisioning of Docker, Webmin and BIND on Debian/Ubuntu")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the user's config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// How failures are listed in the final banner
    #[arg(long, global = true, value_enum)]
    errors: Option<ReportStyle>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install Docker Engine and the Compose plugin
    Docker,
    /// Install Webmin from its official repository
    Webmin,
    /// Install the BIND DNS server
    BindInstall,
    /// Install BIND and configure the lab zone
    BindConfigure,
    /// Run every installer in sequence
    Seed,
    /// Print the effective configuration
    Config,
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = paths::data_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, paths::HOSTSEED_LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}

/// Arguments forwarded to each installer the seed runs
fn forwarded_args(cli: &Cli) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(path) = &cli.config {
        args.push("--config".to_string());
        args.push(path.to_string_lossy().to_string());
    }
    if let Some(style) = cli.errors {
        args.push("--errors".to_string());
        args.push(style.as_arg().to_string());
    }
    if cli.verbose {
        args.push("--verbose".to_string());
    }
    args
}

async fn run_pipeline(pipeline: StepPipeline, facts: &HostFacts, style: ReportStyle) -> i32 {
    tracing::info!("Steps: {}", pipeline.step_names().join(", "));
    let outcome = pipeline.run(facts).await;
    if let Some(banner) = outcome.banner(style) {
        banner.print();
    }

    let code = outcome.exit_code();
    tracing::info!(
        "Finished in state {:?} with exit code {} ({} failures recorded)",
        outcome.state,
        code,
        outcome.sink.len()
    );
    code
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        }
    };

    tracing::info!("Hostseed starting");

    let config = HostseedConfig::load(cli.config.as_deref());
    let runner = CommandRunner::new(config.commands.timeout());

    let code = match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml());
            0
        }
        Commands::Seed => match std::env::current_exe() {
            Ok(exe) => {
                let style = cli.errors.unwrap_or(seed::DEFAULT_STYLE);
                let pipeline = seed::pipeline(exe, forwarded_args(&cli));
                run_pipeline(pipeline, &HostFacts::probe(), style).await
            }
            Err(e) => {
                eprintln!("No se ha podido localizar el ejecutable de hostseed: {}", e);
                FAILURE_EXIT_CODE
            }
        },
        Commands::Docker => {
            let facts = HostFacts::probe();
            let pipeline = docker::pipeline(&config, &runner, &facts);
            run_pipeline(pipeline, &facts, cli.errors.unwrap_or(docker::DEFAULT_STYLE)).await
        }
        Commands::Webmin => {
            let facts = HostFacts::probe();
            let pipeline = webmin::pipeline(&config, &runner, &facts);
            run_pipeline(pipeline, &facts, cli.errors.unwrap_or(webmin::DEFAULT_STYLE)).await
        }
        Commands::BindInstall => {
            let facts = HostFacts::probe();
            let pipeline = bind::install_pipeline(&config, &runner, &facts);
            run_pipeline(pipeline, &facts, cli.errors.unwrap_or(bind::INSTALL_STYLE)).await
        }
        Commands::BindConfigure => {
            let facts = HostFacts::probe();
            let pipeline = bind::configure_pipeline(&config, &runner, &facts);
            run_pipeline(pipeline, &facts, cli.errors.unwrap_or(bind::CONFIGURE_STYLE)).await
        }
    };

    ExitCode::from(u8::try_from(code).unwrap_or(FAILURE_EXIT_CODE as u8))
}
