//! Registered models sheet.
use crate::{
    builder::format_timestamp,
    provenance::GIT_COMMIT_TAG,
    record::{Record, Table},
    tracking::RegisteredModel,
};
use log::warn;
use std::collections::HashSet;

/// Names of the columns of the registered models sheet.
pub mod columns {
    pub const MODEL_NAME: &str = "Model Name";
    pub const VERSION: &str = "Version";
    pub const STAGE: &str = "Stage";
    pub const SOURCE: &str = "Source";
    pub const GIT_COMMIT: &str = "Git Commit";
    pub const CREATION_TIME: &str = "Creation Time";

    pub const FIXED: [&str; 6] = [MODEL_NAME, VERSION, STAGE, SOURCE, GIT_COMMIT, CREATION_TIME];
}

/// Counts shown after the registered models sheet is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistrySummary {
    /// Number of distinct registered models.
    pub total_models: usize,

    /// Number of model versions linked to a git commit.
    pub versions_with_git_commit: usize,
}

/// Builds one row per latest version of each registered model.
///
/// A creation time that cannot be rendered leaves the cell empty.
pub fn registered_model_table(models: &[RegisteredModel]) -> (Table, RegistrySummary) {
    let mut table = Table::new(&columns::FIXED);
    let mut names = HashSet::new();
    let mut summary = RegistrySummary::default();

    for model in models.iter() {
        for version in model.latest_versions.iter() {
            names.insert(model.name.as_str());
            let git_commit = version.tags.get(GIT_COMMIT_TAG);
            if git_commit.is_some() {
                summary.versions_with_git_commit += 1;
            }

            let mut record = Record::empty();
            record.insert(columns::MODEL_NAME, model.name.as_str());
            record.insert(columns::VERSION, version.version.as_str());
            record.insert(columns::STAGE, version.current_stage.as_str());
            record.insert(columns::SOURCE, version.source.as_str());
            record.insert(
                columns::GIT_COMMIT,
                git_commit.map(String::as_str).unwrap_or("No"),
            );
            match format_timestamp(version.creation_timestamp) {
                Ok(creation_time) => record.insert_opt(columns::CREATION_TIME, creation_time),
                Err(e) => warn!("Model {} version {}: {}", model.name, version.version, e),
            }
            table.push(record);
        }
    }
    summary.total_models = names.len();

    (table, summary)
}
