use anyhow::{anyhow, bail, Result};
use mlflow_audit::{run_audit, AuditOutcome, CsvReportWriter};
use mlflow_audit_core::{
    AuditConfig, Experiment, MetricSample, ModelVersion, RegisteredModel, Run, RunInfo, RunStatus,
    TrackingSource,
};
use std::collections::{BTreeMap, HashMap};
use tempdir::TempDir;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Server {
    experiments: Vec<Experiment>,
    runs: Vec<Run>,
    gpu_metrics: HashMap<String, Vec<MetricSample>>,
    models: Option<Vec<RegisteredModel>>,
}

impl TrackingSource for Server {
    fn list_experiments(&self) -> Result<Vec<Experiment>> {
        Ok(self.experiments.clone())
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        Ok(self
            .runs
            .iter()
            .filter(|r| r.info.experiment_id == experiment_id)
            .cloned()
            .collect())
    }

    fn get_metric_history(&self, _run_id: &str, metric_key: &str) -> Result<Vec<MetricSample>> {
        match self.gpu_metrics.get(metric_key) {
            Some(samples) => Ok(samples.clone()),
            None => bail!("RESOURCE_DOES_NOT_EXIST: {}", metric_key),
        }
    }

    fn list_artifacts(&self, _run_id: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }

    fn list_registered_models(&self) -> Result<Vec<RegisteredModel>> {
        self.models
            .clone()
            .ok_or_else(|| anyhow!("FEATURE_DISABLED"))
    }
}

fn server(models: Option<Vec<RegisteredModel>>) -> Server {
    Server {
        experiments: vec![Experiment::new("1", "resnet")],
        runs: vec![Run {
            info: RunInfo {
                run_id: "r1".to_string(),
                run_name: "bright-owl-42".to_string(),
                experiment_id: "1".to_string(),
                status: RunStatus::Running,
                start_time: Some(0),
                end_time: None,
            },
            tags: HashMap::new(),
            params: BTreeMap::from([("epochs".to_string(), "10".to_string())]),
        }],
        gpu_metrics: HashMap::from([(
            "system/gpu_1_utilization_percentage".to_string(),
            vec![MetricSample::new(0, 50.0), MetricSample::new(1000, 70.0)],
        )]),
        models,
    }
}

#[test]
fn test_no_data_writes_nothing() -> Result<()> {
    init();
    let dir = TempDir::new("audit")?;
    let config = AuditConfig::default().output(dir.path().join("summary.csv"));
    let source = Server {
        experiments: vec![],
        runs: vec![],
        gpu_metrics: HashMap::new(),
        models: Some(vec![]),
    };

    let outcome = run_audit(&source, &config, &mut CsvReportWriter::new())?;

    assert_eq!(outcome, AuditOutcome::NoData { skipped: 0 });
    assert!(!config.output.exists());
    Ok(())
}

#[test]
fn test_report_with_registered_models() -> Result<()> {
    init();
    let dir = TempDir::new("audit")?;
    let config = AuditConfig::default().output(dir.path().join("summary.csv"));
    let models = vec![RegisteredModel {
        name: "classifier".to_string(),
        latest_versions: vec![ModelVersion {
            version: "1".to_string(),
            current_stage: "Staging".to_string(),
            source: "models:/classifier/1".to_string(),
            tags: HashMap::new(),
            creation_timestamp: None,
        }],
    }];

    let outcome = run_audit(&server(Some(models)), &config, &mut CsvReportWriter::new())?;

    let paths = match outcome {
        AuditOutcome::Saved {
            paths,
            records,
            skipped,
            registry,
        } => {
            assert_eq!(records, 1);
            assert_eq!(skipped, 0);
            assert_eq!(registry.map(|r| r.total_models), Some(1));
            paths
        }
        AuditOutcome::NoData { .. } => panic!("expected a report"),
    };
    assert_eq!(paths.len(), 2);

    let mut rdr = csv::Reader::from_path(&paths[0])?;
    let header: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
    assert_eq!(header[0], "Experiment Name");
    assert_eq!(
        &header[header.len() - 2..],
        &["Slot_1_History", "Slot_1_Average_Utilization"]
    );

    let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 1);
    let cell = |name: &str| {
        let i = header.iter().position(|h| h == name).unwrap();
        rows[0][i].to_string()
    };
    assert_eq!(cell("Run ID"), "r1");
    assert_eq!(cell("Status"), "RUNNING");
    assert_eq!(cell("End Time"), "");
    assert_eq!(cell("Duration (s)"), "");
    assert_eq!(cell("Overall_Average_Utilization"), "60");
    assert_eq!(cell("Slot_1_Average_Utilization"), "60");
    assert_eq!(cell("Parameters"), "epochs: 10");
    assert_eq!(cell("User"), "Unknown");

    let models = std::fs::read_to_string(&paths[1])?;
    assert!(models.starts_with("Model Name,Version,Stage,Source,Git Commit,Creation Time\n"));
    assert!(models.contains("classifier,1,Staging,models:/classifier/1,No,"));
    Ok(())
}

#[test]
fn test_registry_failure_keeps_experiment_sheet() -> Result<()> {
    init();
    let dir = TempDir::new("audit")?;
    let config = AuditConfig::default().output(dir.path().join("summary.csv"));

    let outcome = run_audit(&server(None), &config, &mut CsvReportWriter::new())?;

    match outcome {
        AuditOutcome::Saved {
            paths, registry, ..
        } => {
            assert_eq!(paths, vec![config.output.clone()]);
            assert_eq!(registry, None);
        }
        AuditOutcome::NoData { .. } => panic!("expected a report"),
    }
    Ok(())
}

#[test]
fn test_unrenderable_model_timestamp_keeps_report() -> Result<()> {
    init();
    let dir = TempDir::new("audit")?;
    let config = AuditConfig::default().output(dir.path().join("summary.csv"));
    let models = vec![RegisteredModel {
        name: "classifier".to_string(),
        latest_versions: vec![ModelVersion {
            version: "1".to_string(),
            current_stage: "None".to_string(),
            source: "models:/classifier/1".to_string(),
            tags: HashMap::new(),
            creation_timestamp: Some(i64::MAX),
        }],
    }];

    let outcome = run_audit(&server(Some(models)), &config, &mut CsvReportWriter::new())?;

    match outcome {
        AuditOutcome::Saved {
            paths, registry, ..
        } => {
            assert_eq!(paths.len(), 2);
            assert!(paths.iter().all(|p| p.exists()));
            assert_eq!(registry.map(|r| r.total_models), Some(1));
        }
        AuditOutcome::NoData { .. } => panic!("expected a report"),
    }
    Ok(())
}

#[test]
fn test_all_runs_skipped_reports_skip_count() -> Result<()> {
    init();
    let dir = TempDir::new("audit")?;
    let config = AuditConfig::default().output(dir.path().join("summary.csv"));
    let mut source = server(Some(vec![]));
    source.runs[0].info.start_time = Some(5_000);
    source.runs[0].info.end_time = Some(1_000);

    let outcome = run_audit(&source, &config, &mut CsvReportWriter::new())?;

    assert_eq!(outcome, AuditOutcome::NoData { skipped: 1 });
    assert!(!config.output.exists());
    Ok(())
}

#[test]
fn test_template_without_slot_fails_before_sweep() -> Result<()> {
    init();
    let dir = TempDir::new("audit")?;
    let config = AuditConfig::default()
        .output(dir.path().join("summary.csv"))
        .metric_template("system/gpu_utilization_percentage");

    let result = run_audit(&server(Some(vec![])), &config, &mut CsvReportWriter::new());

    assert!(result.is_err());
    assert!(!config.output.exists());
    Ok(())
}
