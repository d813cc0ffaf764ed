use anyhow::Result;
use clap::Parser;
use log::info;
use mlflow_audit::{run_audit, AuditOutcome, CsvReportWriter};
use mlflow_audit_core::{AuditConfig, FailurePolicy};
use mlflow_audit_tracking::{MlflowTrackingClient, TrackingSettings};
use std::{path::PathBuf, time::Duration};

/// Audits the experiments and runs of a MLflow tracking server.
///
/// The server address is read from `MLFLOW_TRACKING_URI`, also from a `.env` file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path of the report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of threads building run records
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of resource slots probed per run
    #[arg(long)]
    max_slots: Option<usize>,

    /// Metric name of a resource slot, `{slot}` standing for the slot index
    #[arg(long)]
    metric_template: Option<String>,

    /// What to do with runs whose record cannot be built: skip or abort
    #[arg(long)]
    failure_policy: Option<FailurePolicy>,

    /// Timeout of each request in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not write the registered models sheet
    #[arg(long)]
    skip_registered_models: bool,
}

impl Args {
    fn audit_config(&self) -> Result<AuditConfig> {
        let mut config = match &self.config {
            Some(path) => AuditConfig::load(path)?,
            None => AuditConfig::default(),
        };
        if let Some(v) = &self.output {
            config = config.output(v);
        }
        if let Some(v) = self.workers {
            config = config.workers(v);
        }
        if let Some(v) = self.max_slots {
            config = config.max_slots(v);
        }
        if let Some(v) = &self.metric_template {
            config = config.metric_template(v);
        }
        if let Some(v) = self.failure_policy {
            config = config.failure_policy(v);
        }
        if let Some(v) = self.timeout {
            config = config.request_timeout_secs(v);
        }
        if self.skip_registered_models {
            config = config.include_registered_models(false);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let settings = TrackingSettings::from_env()?;
    let config = args.audit_config()?;
    info!("Auditing {} with {:?}", settings.uri, config);

    let client = MlflowTrackingClient::from_settings(
        &settings,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let mut writer = CsvReportWriter::new();

    match run_audit(&client, &config, &mut writer)? {
        AuditOutcome::NoData { skipped } => {
            println!("No experiment data found.");
            if skipped > 0 {
                println!("Skipped {} runs or experiments because of failures", skipped);
            }
        }
        AuditOutcome::Saved {
            paths,
            records,
            skipped,
            registry,
        } => {
            println!("Processed {} runs ({} skipped)", records, skipped);
            if let Some(registry) = registry {
                println!("Total Registered Models: {}", registry.total_models);
                println!(
                    "Models Linked to Git Commits: {}",
                    registry.versions_with_git_commit
                );
            }
            for path in paths.iter() {
                println!("Saved report to {}", path.display());
            }
        }
    }

    Ok(())
}
