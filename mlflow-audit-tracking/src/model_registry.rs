use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ModelVersionTag {
    pub key: String,
    pub value: String,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
/// Fields taken from <https://mlflow.org/docs/latest/rest-api.html#modelversion>.
pub struct ModelVersion {
    pub name: Option<String>,
    pub version: String,
    pub creation_timestamp: Option<i64>,
    pub current_stage: Option<String>,
    pub source: Option<String>,
    pub run_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<ModelVersionTag>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
/// Fields taken from <https://mlflow.org/docs/latest/rest-api.html#registeredmodel>.
pub struct RegisteredModel {
    pub name: String,
    pub creation_timestamp: Option<i64>,
    #[serde(default)]
    pub latest_versions: Vec<ModelVersion>,
}

impl From<RegisteredModel> for mlflow_audit_core::RegisteredModel {
    fn from(model: RegisteredModel) -> Self {
        Self {
            name: model.name,
            latest_versions: model
                .latest_versions
                .into_iter()
                .map(|v| mlflow_audit_core::ModelVersion {
                    version: v.version,
                    current_stage: v.current_stage.unwrap_or_else(|| "None".to_string()),
                    source: v.source.unwrap_or_default(),
                    tags: v.tags.into_iter().map(|t| (t.key, t.value)).collect(),
                    creation_timestamp: v.creation_timestamp,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// Response of `registered-models/search`.
pub(crate) struct SearchRegisteredModels {
    #[serde(default)]
    pub registered_models: Vec<RegisteredModel>,
    pub next_page_token: Option<String>,
}
