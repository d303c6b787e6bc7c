//! jobwatch CLI
//!
//! Runs the daily job monitor, or records a completion metric for a job.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use jobwatch::alerting::{AlertDispatcher, MessageTemplates, SlackNotifier};
use jobwatch::config::{Config, LoggingConfig};
use jobwatch::metrics::MetricEmitter;
use jobwatch::monitor::Monitor;
use jobwatch::platform::DnanexusClient;

/// jobwatch - failed job alerts for 002 projects
#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "JOBWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan monitored projects and post alerts (default)
    Check {
        /// How to print the run summary
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Write a completion metric for a job into PROM_PATH
    RecordCompletion {
        /// Metric-safe job name (letters, digits, underscores)
        job_name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging, cli.verbose);

    let result = match cli.command.unwrap_or(Commands::Check {
        format: OutputFormat::Text,
    }) {
        Commands::Check { format } => run_check(config, format).await,
        Commands::RecordCompletion { job_name } => run_record_completion(&config, &job_name),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "jobwatch failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_check(config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let notifier = Arc::new(SlackNotifier::from_config(&config.slack)?);

    if let Err(e) = config.require_tokens() {
        let templates = MessageTemplates::from_config(&config);
        AlertDispatcher::new(notifier)
            .send(&templates.startup_failure(&e.to_string()))
            .await;
        return Err(e.into());
    }

    let platform = Arc::new(DnanexusClient::from_config(&config.platform)?);
    let monitor = Monitor::new(&config, platform, notifier);

    info!(pattern = %config.platform.project_pattern, "Starting monitoring run");
    let report = monitor.run().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            if let Some(e) = &report.discovery_error {
                println!("Project discovery failed: {e}");
            }
            println!("Projects discovered: {}", report.projects_discovered);
            println!("  with failures:     {}", report.with_failures);
            println!("  clean:             {}", report.clean);
            println!("  no activity:       {}", report.no_activity);
            println!("  skipped:           {}", report.projects_skipped);
            println!(
                "Messages sent: {} ({} failed)",
                report.messages_sent, report.messages_failed
            );
        }
    }

    Ok(())
}

fn run_record_completion(config: &Config, job_name: &str) -> anyhow::Result<()> {
    let emitter = MetricEmitter::from_config(&config.metrics)?;
    debug!(job = %job_name, dir = %emitter.out_dir().display(), "Recording completion");
    let path = emitter.record_completion(job_name)?;
    info!(path = %path.display(), "Completion metric written");
    Ok(())
}
