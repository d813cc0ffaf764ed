//! Provenance signals recovered from the tags of a run.
//!
//! Tags are a free-form map. Only the keys below are recognized, each with its own default when
//! absent. Resolution is a pure function over an already fetched tag map.
use std::{collections::HashMap, fmt::Display};

/// User who started the run.
pub const USER_TAG: &str = "mlflow.user";
/// Entry point of the run.
pub const SOURCE_TAG: &str = "mlflow.source.name";
/// Source-control commit of the code.
pub const GIT_COMMIT_TAG: &str = "mlflow.source.git.commit";
/// Reference to the dataset the run consumed.
pub const DATASET_TAG: &str = "mlflow.dataset";
/// Conda environment specification.
pub const CONDA_ENV_TAG: &str = "mlflow.conda_env";
/// pip requirements file.
pub const REQUIREMENTS_TAG: &str = "mlflow.requirements";
/// Docker image the run was executed in.
pub const DOCKER_IMAGE_TAG: &str = "mlflow.docker.image.name";
/// History of models logged in the run.
pub const LOG_MODEL_HISTORY_TAG: &str = "mlflow.log-model.history";

const UNKNOWN: &str = "Unknown";
const NO: &str = "No";

/// How the execution environment of a run can be reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    Conda,
    Requirements,
    Docker,
    No,
}

impl Display for EnvironmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Conda => "Conda",
            Self::Requirements => "Requirements",
            Self::Docker => "Docker",
            Self::No => NO,
        };
        write!(f, "{}", s)
    }
}

/// Environment tags in priority order. The first one present wins.
const ENVIRONMENT_PRIORITY: [(&str, EnvironmentKind); 3] = [
    (CONDA_ENV_TAG, EnvironmentKind::Conda),
    (REQUIREMENTS_TAG, EnvironmentKind::Requirements),
    (DOCKER_IMAGE_TAG, EnvironmentKind::Docker),
];

/// Provenance of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceInfo {
    pub user: String,
    pub source: String,
    pub git_commit: String,
    pub dataset: String,
    pub environment_kind: EnvironmentKind,
}

fn tag_or(tags: &HashMap<String, String>, key: &str, default: &str) -> String {
    tags.get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

/// Resolves the provenance of a run from its tags.
pub fn resolve(tags: &HashMap<String, String>) -> ProvenanceInfo {
    let environment_kind = ENVIRONMENT_PRIORITY
        .iter()
        .find(|(key, _)| tags.contains_key(*key))
        .map(|(_, kind)| *kind)
        .unwrap_or(EnvironmentKind::No);

    ProvenanceInfo {
        user: tag_or(tags, USER_TAG, UNKNOWN),
        source: tag_or(tags, SOURCE_TAG, UNKNOWN),
        git_commit: tag_or(tags, GIT_COMMIT_TAG, NO),
        dataset: tag_or(tags, DATASET_TAG, NO),
        environment_kind,
    }
}
