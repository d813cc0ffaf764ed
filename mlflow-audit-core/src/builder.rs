//! Assembly of one denormalized report row per run.
use crate::{
    aggregator::ResourceUtilizationAggregator,
    config::AuditConfig,
    error::AuditError,
    provenance::{self, LOG_MODEL_HISTORY_TAG},
    record::Record,
    tracking::{Experiment, Run, TrackingSource},
};
use anyhow::{Context, Result};
use chrono::{Local, TimeZone, Utc};
use itertools::Itertools;
use std::{collections::BTreeMap, fmt::Display};

/// Names of the fixed columns of the experiment sheet.
pub mod columns {
    pub const EXPERIMENT_NAME: &str = "Experiment Name";
    pub const RUN_ID: &str = "Run ID";
    pub const RUN_NAME: &str = "Run Name";
    pub const USER: &str = "User";
    pub const SOURCE: &str = "Source";
    pub const STATUS: &str = "Status";
    pub const START_TIME: &str = "Start Time";
    pub const END_TIME: &str = "End Time";
    pub const DURATION: &str = "Duration (s)";
    pub const GIT_COMMIT: &str = "Git Commit";
    pub const DATASET: &str = "Dataset";
    pub const ENVIRONMENT: &str = "Environment";
    pub const OVERALL_AVERAGE: &str = "Overall_Average_Utilization";
    pub const PARAMETERS: &str = "Parameters";
    pub const LOGGED_MODELS: &str = "Logged Models";
    pub const REGISTERED_MODELS: &str = "Registered Models";

    /// Fixed columns in report order.
    pub const FIXED: [&str; 16] = [
        EXPERIMENT_NAME,
        RUN_ID,
        RUN_NAME,
        USER,
        SOURCE,
        STATUS,
        START_TIME,
        END_TIME,
        DURATION,
        GIT_COMMIT,
        DATASET,
        ENVIRONMENT,
        OVERALL_AVERAGE,
        PARAMETERS,
        LOGGED_MODELS,
        REGISTERED_MODELS,
    ];
}

/// Format of rendered timestamps.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

const NO_REGISTERED_MODELS: &str = "None";

/// Renders epoch milliseconds as `day/month/year hour:minute:second` in time zone `tz`.
///
/// An absent timestamp stays absent.
pub fn format_timestamp_in<Tz>(millis: Option<i64>, tz: &Tz) -> Result<Option<String>, AuditError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    millis
        .map(|ms| {
            Utc.timestamp_millis_opt(ms)
                .single()
                .map(|t| t.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string())
                .ok_or(AuditError::TimestampOutOfRange(ms))
        })
        .transpose()
}

/// Renders epoch milliseconds in the local time zone, see [`format_timestamp_in()`].
pub fn format_timestamp(millis: Option<i64>) -> Result<Option<String>, AuditError> {
    format_timestamp_in(millis, &Local)
}

/// Duration of a run in seconds.
///
/// Absent unless both ends are known. An ongoing run never reports zero.
pub fn duration_secs(
    run_id: &str,
    start_time: Option<i64>,
    end_time: Option<i64>,
) -> Result<Option<f64>, AuditError> {
    match (start_time, end_time) {
        (Some(start_time), Some(end_time)) if end_time < start_time => {
            Err(AuditError::EndBeforeStart {
                run_id: run_id.to_string(),
                start_time,
                end_time,
            })
        }
        (Some(start_time), Some(end_time)) => end_time
            .checked_sub(start_time)
            .map(|ms| Some(ms as f64 / 1000.0))
            .ok_or(AuditError::TimestampOutOfRange(end_time)),
        _ => Ok(None),
    }
}

/// Renders parameters as `key: value` pairs joined by `, `, in key order.
pub fn render_params(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .join(", ")
}

/// Builds the report row of a run.
pub struct RunRecordBuilder<'a, S: ?Sized> {
    source: &'a S,
    aggregator: ResourceUtilizationAggregator<'a, S>,
}

impl<'a, S> RunRecordBuilder<'a, S>
where
    S: TrackingSource + ?Sized,
{
    pub fn new(source: &'a S, config: &AuditConfig) -> Self {
        Self {
            source,
            aggregator: ResourceUtilizationAggregator::new(
                source,
                config.max_slots,
                config.metric_template.clone(),
            ),
        }
    }

    /// Builds the record of `run` of `experiment`.
    ///
    /// Fails on malformed run metadata or when the artifacts of the run cannot be listed.
    /// Missing metrics never fail: they leave the corresponding columns absent.
    pub fn build(&self, experiment: &Experiment, run: &Run) -> Result<Record> {
        let info = &run.info;
        let provenance = provenance::resolve(&run.tags);
        let duration = duration_secs(&info.run_id, info.start_time, info.end_time)?;
        let start_time = format_timestamp(info.start_time)?;
        let end_time = format_timestamp(info.end_time)?;
        let artifacts = self
            .source
            .list_artifacts(&info.run_id)
            .with_context(|| format!("Failed to list artifacts of run {}", info.run_id))?;
        let utilization = self.aggregator.aggregate(&info.run_id);

        let mut record = Record::empty();
        record.insert(columns::EXPERIMENT_NAME, experiment.name.as_str());
        record.insert(columns::RUN_ID, info.run_id.as_str());
        record.insert(columns::RUN_NAME, info.run_name.as_str());
        record.insert(columns::USER, provenance.user);
        record.insert(columns::SOURCE, provenance.source);
        record.insert(columns::STATUS, info.status.to_string());
        record.insert_opt(columns::START_TIME, start_time);
        record.insert_opt(columns::END_TIME, end_time);
        record.insert_opt(columns::DURATION, duration);
        record.insert(columns::GIT_COMMIT, provenance.git_commit);
        record.insert(columns::DATASET, provenance.dataset);
        record.insert(columns::ENVIRONMENT, provenance.environment_kind.to_string());
        record.insert_opt(columns::OVERALL_AVERAGE, utilization.overall_average);
        record.insert(columns::PARAMETERS, render_params(&run.params));
        record.insert(columns::LOGGED_MODELS, artifacts.join(", "));
        record.insert(
            columns::REGISTERED_MODELS,
            run.tags
                .get(LOG_MODEL_HISTORY_TAG)
                .map(String::as_str)
                .unwrap_or(NO_REGISTERED_MODELS),
        );
        record.merge_inplace(utilization.slot_columns());

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metric::MetricSample,
        tracking::{RegisteredModel, RunInfo, RunStatus},
    };
    use anyhow::{anyhow, bail};
    use chrono::FixedOffset;
    use std::collections::HashMap;

    struct SingleRun {
        gpu_0: Vec<MetricSample>,
        artifacts: Option<Vec<String>>,
    }

    impl TrackingSource for SingleRun {
        fn list_experiments(&self) -> Result<Vec<Experiment>> {
            Ok(vec![])
        }

        fn list_runs(&self, _experiment_id: &str) -> Result<Vec<Run>> {
            Ok(vec![])
        }

        fn get_metric_history(&self, _run_id: &str, metric_key: &str) -> Result<Vec<MetricSample>> {
            if metric_key == "system/gpu_0_utilization_percentage" {
                Ok(self.gpu_0.clone())
            } else {
                bail!("not found")
            }
        }

        fn list_artifacts(&self, _run_id: &str) -> Result<Vec<String>> {
            self.artifacts
                .clone()
                .ok_or_else(|| anyhow!("artifact store unreachable"))
        }

        fn list_registered_models(&self) -> Result<Vec<RegisteredModel>> {
            Ok(vec![])
        }
    }

    fn run(start_time: Option<i64>, end_time: Option<i64>) -> Run {
        Run {
            info: RunInfo {
                run_id: "r1".to_string(),
                run_name: "bright-owl-42".to_string(),
                experiment_id: "1".to_string(),
                status: RunStatus::Finished,
                start_time,
                end_time,
            },
            tags: HashMap::from([
                ("mlflow.user".to_string(), "alice".to_string()),
                ("mlflow.conda_env".to_string(), "conda.yaml".to_string()),
            ]),
            params: BTreeMap::from([
                ("lr".to_string(), "0.001".to_string()),
                ("batch_size".to_string(), "64".to_string()),
            ]),
        }
    }

    #[test]
    fn test_build_record() -> Result<()> {
        let source = SingleRun {
            gpu_0: vec![MetricSample::new(0, 5.0), MetricSample::new(1, 15.0)],
            artifacts: Some(vec!["model".to_string(), "metrics.json".to_string()]),
        };
        let builder = RunRecordBuilder::new(&source, &AuditConfig::default());
        let record = builder.build(
            &Experiment::new("1", "resnet"),
            &run(Some(1_000), Some(61_500)),
        )?;

        assert_eq!(record.get_string(columns::EXPERIMENT_NAME)?, "resnet");
        assert_eq!(record.get_string(columns::RUN_NAME)?, "bright-owl-42");
        assert_eq!(record.get_string(columns::USER)?, "alice");
        assert_eq!(record.get_string(columns::SOURCE)?, "Unknown");
        assert_eq!(record.get_string(columns::STATUS)?, "FINISHED");
        assert_eq!(record.get_string(columns::GIT_COMMIT)?, "No");
        assert_eq!(record.get_string(columns::ENVIRONMENT)?, "Conda");
        assert_eq!(record.get_scalar(columns::DURATION)?, 60.5);
        assert_eq!(record.get_scalar(columns::OVERALL_AVERAGE)?, 10.0);
        assert_eq!(record.get_scalar("Slot_0_Average_Utilization")?, 10.0);
        assert_eq!(
            record.get_string("Slot_0_History")?,
            "Timestamp: 0, Value: 5.0; Timestamp: 1, Value: 15.0"
        );
        assert_eq!(
            record.get_string(columns::PARAMETERS)?,
            "batch_size: 64, lr: 0.001"
        );
        assert_eq!(record.get_string(columns::LOGGED_MODELS)?, "model, metrics.json");
        assert_eq!(record.get_string(columns::REGISTERED_MODELS)?, "None");
        assert!(record.contains_key(columns::START_TIME));
        Ok(())
    }

    #[test]
    fn test_ongoing_run_has_no_duration() -> Result<()> {
        let source = SingleRun {
            gpu_0: vec![],
            artifacts: Some(vec![]),
        };
        let builder = RunRecordBuilder::new(&source, &AuditConfig::default());
        let record = builder.build(&Experiment::new("1", "resnet"), &run(Some(1_000), None))?;

        assert!(!record.contains_key(columns::DURATION));
        assert!(!record.contains_key(columns::END_TIME));
        assert!(!record.contains_key(columns::OVERALL_AVERAGE));
        assert!(!record.keys().any(|k| k.starts_with("Slot_")));
        Ok(())
    }

    #[test]
    fn test_anomalies_fail_the_run() {
        let source = SingleRun {
            gpu_0: vec![],
            artifacts: Some(vec![]),
        };
        let builder = RunRecordBuilder::new(&source, &AuditConfig::default());
        let err = builder
            .build(&Experiment::new("1", "resnet"), &run(Some(5_000), Some(1_000)))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuditError>(),
            Some(AuditError::EndBeforeStart { .. })
        ));
        assert!(builder
            .build(
                &Experiment::new("1", "resnet"),
                &run(Some(i64::MIN), Some(i64::MAX))
            )
            .is_err());

        let source = SingleRun {
            gpu_0: vec![],
            artifacts: None,
        };
        let builder = RunRecordBuilder::new(&source, &AuditConfig::default());
        assert!(builder
            .build(&Experiment::new("1", "resnet"), &run(Some(1_000), None))
            .is_err());
    }

    #[test]
    fn test_format_timestamp() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            format_timestamp_in(Some(1_700_000_000_000), &utc).unwrap(),
            Some("14/11/2023 22:13:20".to_string())
        );
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(
            format_timestamp_in(Some(0), &tokyo).unwrap(),
            Some("01/01/1970 09:00:00".to_string())
        );
        assert_eq!(format_timestamp_in(None, &utc).unwrap(), None);
        assert!(matches!(
            format_timestamp_in(Some(i64::MAX), &utc),
            Err(AuditError::TimestampOutOfRange(_))
        ));
    }

    #[test]
    fn test_duration_secs() {
        assert_eq!(duration_secs("r", Some(0), Some(1_500)).unwrap(), Some(1.5));
        assert_eq!(duration_secs("r", Some(0), Some(0)).unwrap(), Some(0.0));
        assert_eq!(duration_secs("r", Some(0), None).unwrap(), None);
        assert_eq!(duration_secs("r", None, Some(10)).unwrap(), None);
        assert!(duration_secs("r", Some(10), Some(0)).is_err());
        assert!(matches!(
            duration_secs("r", Some(i64::MIN), Some(i64::MAX)),
            Err(AuditError::TimestampOutOfRange(_))
        ));
    }
}
