//! Read-only view of an experiment tracking server.
//!
//! [`TrackingSource`] is the seam between the aggregation pipeline and the server. The pipeline
//! only ever receives an explicitly constructed source, so every component can be exercised
//! with an in-memory implementation.
use crate::metric::MetricSample;
use anyhow::Result;
use std::{
    collections::{BTreeMap, HashMap},
    convert::Infallible,
    fmt::Display,
    str::FromStr,
};

/// An experiment: identifier and human-readable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
}

impl Experiment {
    pub fn new(experiment_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            name: name.into(),
        }
    }
}

/// Lifecycle status of a run.
///
/// Unknown statuses reported by the server are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Scheduled,
    Finished,
    Failed,
    Killed,
    Other(String),
}

impl FromStr for RunStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "RUNNING" => Self::Running,
            "SCHEDULED" => Self::Scheduled,
            "FINISHED" => Self::Finished,
            "FAILED" => Self::Failed,
            "KILLED" => Self::Killed,
            other => Self::Other(other.to_string()),
        })
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "RUNNING",
            Self::Scheduled => "SCHEDULED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
            Self::Other(s) => s,
        };
        write!(f, "{}", s)
    }
}

/// Metadata of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub run_id: String,
    pub run_name: String,
    pub experiment_id: String,
    pub status: RunStatus,

    /// Start time in milliseconds since the Unix epoch.
    pub start_time: Option<i64>,

    /// End time in milliseconds since the Unix epoch, absent while the run is ongoing.
    pub end_time: Option<i64>,
}

/// A snapshot of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub info: RunInfo,

    /// Free-form tags. No key is guaranteed to be present.
    pub tags: HashMap<String, String>,

    /// Logged parameters, ordered by key.
    pub params: BTreeMap<String, String>,
}

/// A version of a registered model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVersion {
    pub version: String,
    pub current_stage: String,
    pub source: String,
    pub tags: HashMap<String, String>,

    /// Creation time in milliseconds since the Unix epoch.
    pub creation_timestamp: Option<i64>,
}

/// A model in the model registry with its latest versions.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredModel {
    pub name: String,
    pub latest_versions: Vec<ModelVersion>,
}

/// Read-only queries against a tracking server.
///
/// All calls are idempotent, so retrying them or issuing them concurrently is safe.
pub trait TrackingSource {
    /// Lists all experiments.
    fn list_experiments(&self) -> Result<Vec<Experiment>>;

    /// Lists all runs of an experiment.
    fn list_runs(&self, experiment_id: &str) -> Result<Vec<Run>>;

    /// Gets all samples of a metric logged in a run.
    ///
    /// Fails if the run or the metric does not exist.
    fn get_metric_history(&self, run_id: &str, metric_key: &str) -> Result<Vec<MetricSample>>;

    /// Lists the paths of the top-level artifacts of a run.
    fn list_artifacts(&self, run_id: &str) -> Result<Vec<String>>;

    /// Lists registered models with their latest versions.
    fn list_registered_models(&self) -> Result<Vec<RegisteredModel>>;
}
