use anyhow::Result;
use log::{info, warn};
use mlflow_audit_core::{
    registry::{registered_model_table, RegistrySummary},
    report::{Report, ReportWriter, EXPERIMENT_SHEET, REGISTERED_MODELS_SHEET},
    AuditConfig, ExperimentSweep, TrackingSource,
};
use std::path::PathBuf;

/// What an audit produced.
#[derive(Debug, PartialEq)]
pub enum AuditOutcome {
    /// No record was built; nothing was written.
    NoData {
        /// Number of runs or experiments left out because of a failure.
        skipped: usize,
    },

    /// The report was written.
    Saved {
        /// Files written, the experiment sheet first.
        paths: Vec<PathBuf>,

        /// Number of runs in the experiment sheet.
        records: usize,

        /// Number of runs or experiments left out because of a failure.
        skipped: usize,

        /// Counts of the registered models sheet, if written.
        registry: Option<RegistrySummary>,
    },
}

/// Sweeps the tracking server, then writes the report with `writer` to `config.output`.
///
/// An invalid `config` fails before any request is made.
///
/// The whole report is built in memory before anything is written.
pub fn run_audit<S, W>(source: &S, config: &AuditConfig, writer: &mut W) -> Result<AuditOutcome>
where
    S: TrackingSource + Sync + ?Sized,
    W: ReportWriter + ?Sized,
{
    config.validate()?;
    let sweep = ExperimentSweep::new(source, config).run()?;
    if sweep.is_empty() {
        return Ok(AuditOutcome::NoData {
            skipped: sweep.skipped,
        });
    }

    let records = sweep.records.len();
    let skipped = sweep.skipped;
    let mut report = Report::new();
    report.add_sheet(EXPERIMENT_SHEET, sweep.into_table());

    let mut registry = None;
    if config.include_registered_models {
        match source.list_registered_models() {
            Ok(models) if models.is_empty() => {
                info!("No registered models found. Skipping Registered Models sheet.")
            }
            Ok(models) => {
                let (table, summary) = registered_model_table(&models);
                report.add_sheet(REGISTERED_MODELS_SHEET, table);
                registry = Some(summary);
            }
            Err(e) => warn!("Error fetching registered models: {:#}", e),
        }
    }

    let paths = report.write(writer, &config.output)?;

    Ok(AuditOutcome::Saved {
        paths,
        records,
        skipped,
        registry,
    })
}
