//! Configuration of an audit.
use crate::{aggregator::SLOT_PLACEHOLDER, error::AuditError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default number of resource slots probed per run.
pub const DEFAULT_MAX_SLOTS: usize = 12;

/// Default metric name of a slot, as logged by MLflow system metrics.
pub const DEFAULT_METRIC_TEMPLATE: &str = "system/gpu_{slot}_utilization_percentage";

/// Default path of the report.
pub const DEFAULT_OUTPUT: &str = "experiment_metrics_summary.csv";

/// What the sweep does when the record of a run cannot be built.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and continue with the next run.
    Skip,

    /// Stop the sweep with the failure.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(AuditError::UnknownFailurePolicy(other.to_string())),
        }
    }
}

impl Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Configuration of an audit.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct AuditConfig {
    /// Upper bound of resource slots probed per run.
    pub max_slots: usize,

    /// Metric name of a slot, `{slot}` standing for the slot index.
    pub metric_template: String,

    /// Number of threads building run records. `1` builds them sequentially.
    pub workers: usize,

    /// Handling of runs whose record cannot be built.
    pub failure_policy: FailurePolicy,

    /// Timeout of each request to the tracking server in seconds.
    pub request_timeout_secs: u64,

    /// Path of the report.
    pub output: PathBuf,

    /// Adds a sheet listing registered models.
    pub include_registered_models: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_slots: DEFAULT_MAX_SLOTS,
            metric_template: DEFAULT_METRIC_TEMPLATE.to_string(),
            workers: 1,
            failure_policy: FailurePolicy::Skip,
            request_timeout_secs: 30,
            output: PathBuf::from(DEFAULT_OUTPUT),
            include_registered_models: true,
        }
    }
}

impl AuditConfig {
    /// Sets the upper bound of resource slots.
    pub fn max_slots(mut self, v: usize) -> Self {
        self.max_slots = v;
        self
    }

    /// Sets the metric name template of a slot.
    pub fn metric_template(mut self, v: impl Into<String>) -> Self {
        self.metric_template = v.into();
        self
    }

    /// Sets the number of worker threads, at least one.
    pub fn workers(mut self, v: usize) -> Self {
        self.workers = v.max(1);
        self
    }

    /// Sets the failure policy.
    pub fn failure_policy(mut self, v: FailurePolicy) -> Self {
        self.failure_policy = v;
        self
    }

    /// Sets the request timeout in seconds.
    pub fn request_timeout_secs(mut self, v: u64) -> Self {
        self.request_timeout_secs = v;
        self
    }

    /// Sets the path of the report.
    pub fn output(mut self, v: impl Into<PathBuf>) -> Self {
        self.output = v.into();
        self
    }

    /// Enables or disables the registered models sheet.
    pub fn include_registered_models(mut self, v: bool) -> Self {
        self.include_registered_models = v;
        self
    }

    /// Checks that every slot maps to its own metric name.
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.metric_template.contains(SLOT_PLACEHOLDER) {
            Ok(())
        } else {
            Err(AuditError::InvalidMetricTemplate(
                self.metric_template.clone(),
            ))
        }
    }

    /// Constructs [`AuditConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b: Self = serde_yaml::from_reader(rdr)?;
        b.validate()?;
        Ok(b)
    }

    /// Saves [`AuditConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
