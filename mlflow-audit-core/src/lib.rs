//! Metrics aggregation pipeline of the MLflow efficiency audit.
//!
//! The pipeline walks every run of every experiment of a tracking server and folds each run into
//! one denormalized [`Record`](record::Record):
//!
//! * [`MetricHistoryFetcher`] retrieves metric histories, mapping failures to empty series.
//! * [`ResourceUtilizationAggregator`] probes a bounded set of per-slot metrics (e.g. one per
//!   GPU) and reduces them to averages and serialized histories.
//! * [`provenance::resolve()`] extracts user, source, git commit, dataset and environment from
//!   the tags of a run.
//! * [`RunRecordBuilder`] assembles the record of a run.
//! * [`ExperimentSweep`] drives the whole walk.
//!
//! The tracking server is reached only through the [`TrackingSource`] trait and the report is
//! persisted only through the [`ReportWriter`](report::ReportWriter) trait.
pub mod aggregator;
pub mod builder;
pub mod config;
pub mod error;
pub mod metric;
pub mod provenance;
pub mod record;
pub mod registry;
pub mod report;
pub mod sweep;
pub mod tracking;

mod fetcher;

pub use aggregator::{ResourceSlot, ResourceUtilizationAggregator, SlotUtilization};
pub use builder::RunRecordBuilder;
pub use config::{AuditConfig, FailurePolicy};
pub use error::AuditError;
pub use fetcher::MetricHistoryFetcher;
pub use metric::{MetricSample, MetricSeries};
pub use sweep::{ExperimentSweep, Sweep};
pub use tracking::{Experiment, ModelVersion, RegisteredModel, Run, RunInfo, RunStatus, TrackingSource};
