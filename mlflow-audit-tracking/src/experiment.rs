use serde::Deserialize;

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct ExperimentTag {
    pub key: String,
    pub value: String,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
/// Fields taken from <https://mlflow.org/docs/latest/rest-api.html#mlflowexperiment>.
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub artifact_location: Option<String>,
    pub lifecycle_stage: Option<String>,
    pub last_update_time: Option<i64>,
    pub creation_time: Option<i64>,
    pub tags: Option<Vec<ExperimentTag>>,
}

impl From<Experiment> for mlflow_audit_core::Experiment {
    fn from(e: Experiment) -> Self {
        Self::new(e.experiment_id, e.name)
    }
}

#[derive(Debug, Deserialize)]
/// Response of `experiments/search`.
pub(crate) struct SearchExperiments {
    #[serde(default)]
    pub experiments: Vec<Experiment>,
    pub next_page_token: Option<String>,
}
