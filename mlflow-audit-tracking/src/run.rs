use mlflow_audit_core::{RunInfo as CoreRunInfo, RunStatus};
use serde::Deserialize;

/// Tag holding the run name on servers that predate `RunInfo.run_name`.
const RUN_NAME_TAG: &str = "mlflow.runName";

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct Run {
    pub info: RunInfo,
    #[serde(default)]
    pub data: RunData,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub run_name: Option<String>,
    pub experiment_id: String,
    pub status: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub artifact_uri: Option<String>,
    pub lifecycle_stage: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Default, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub tags: Vec<RunTag>,
}

#[derive(Debug, Deserialize)]
pub struct RunTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct Param {
    pub key: String,
    pub value: String,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    pub timestamp: i64,
    #[serde(default)]
    pub step: i64,
}

impl From<Run> for mlflow_audit_core::Run {
    fn from(run: Run) -> Self {
        let tags: std::collections::HashMap<String, String> = run
            .data
            .tags
            .into_iter()
            .map(|t| (t.key, t.value))
            .collect();
        let run_name = run
            .info
            .run_name
            .or_else(|| tags.get(RUN_NAME_TAG).cloned())
            .unwrap_or_default();
        let status: RunStatus = match run.info.status.as_deref().unwrap_or("").parse() {
            Ok(status) => status,
            Err(never) => match never {},
        };

        Self {
            info: CoreRunInfo {
                run_id: run.info.run_id,
                run_name,
                experiment_id: run.info.experiment_id,
                status,
                start_time: run.info.start_time,
                end_time: run.info.end_time,
            },
            params: run
                .data
                .params
                .into_iter()
                .map(|p| (p.key, p.value))
                .collect(),
            tags,
        }
    }
}

#[derive(Debug, Deserialize)]
/// Response of `runs/search`.
pub(crate) struct SearchRuns {
    #[serde(default)]
    pub runs: Vec<Run>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
/// Response of `metrics/get-history`.
pub(crate) struct MetricHistory {
    #[serde(default)]
    pub metrics: Vec<Metric>,
    pub next_page_token: Option<String>,
}
