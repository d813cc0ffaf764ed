//! Walk over every run of every experiment.
use crate::{
    builder::{columns, RunRecordBuilder},
    config::{AuditConfig, FailurePolicy},
    record::{Record, Table},
    tracking::{Experiment, Run, TrackingSource},
};
use anyhow::{Context, Error, Result};
use crossbeam_channel::unbounded;
use log::{debug, info, warn};

/// Result of a sweep.
#[derive(Debug, Default)]
pub struct Sweep {
    /// Records in experiment order, then run order.
    pub records: Vec<Record>,

    /// Number of experiments found.
    pub experiments: usize,

    /// Number of runs found.
    pub runs: usize,

    /// Number of runs or experiments skipped because of a failure.
    pub skipped: usize,
}

impl Sweep {
    /// Returns `true` if no record was built.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Converts the records into the experiment sheet.
    pub fn into_table(self) -> Table {
        let mut table = Table::new(&columns::FIXED);
        table.extend(self.records);
        table
    }
}

struct Job<'r> {
    experiment: usize,
    run: &'r Run,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Builds the records of all runs found on a tracking server.
///
/// ```mermaid
/// flowchart LR
///     A[list experiments] --> B[list runs per experiment]
///     B --> C[RunRecordBuilder]
///     C --> D[provenance]
///     C --> E[slot aggregation]
///     E --> F[metric history]
///     C --> G[records in sweep order]
/// ```
///
/// Failing to list experiments fails the sweep. Failing to list the runs of one experiment or
/// to build the record of one run is handled by the [`FailurePolicy`]: with
/// [`FailurePolicy::Skip`] the failure is logged and the sweep goes on, with
/// [`FailurePolicy::Abort`] the first failure is returned.
///
/// With more than one worker, records are built on a pool of scoped threads. Each record only
/// depends on its own run, and the output order is the same as in a sequential sweep.
pub struct ExperimentSweep<'a, S: ?Sized> {
    source: &'a S,
    builder: RunRecordBuilder<'a, S>,
    policy: FailurePolicy,
    workers: usize,
}

impl<'a, S> ExperimentSweep<'a, S>
where
    S: TrackingSource + Sync + ?Sized,
{
    pub fn new(source: &'a S, config: &AuditConfig) -> Self {
        Self {
            source,
            builder: RunRecordBuilder::new(source, config),
            policy: config.failure_policy,
            workers: config.workers.max(1),
        }
    }

    /// Runs the sweep.
    pub fn run(&self) -> Result<Sweep> {
        let experiments = self
            .source
            .list_experiments()
            .context("Failed to list experiments")?;
        info!("Found {} experiments", experiments.len());

        let mut sweep = Sweep {
            experiments: experiments.len(),
            ..Default::default()
        };

        let mut runs = vec![];
        for (i, experiment) in experiments.iter().enumerate() {
            match self.source.list_runs(&experiment.experiment_id) {
                Ok(rs) => {
                    debug!("Experiment '{}': {} runs", experiment.name, rs.len());
                    runs.extend(rs.into_iter().map(|run| (i, run)));
                }
                Err(e) => {
                    let e = e.context(format!(
                        "Failed to list runs of experiment '{}'",
                        experiment.name
                    ));
                    self.absorb(e, &mut sweep)?;
                }
            }
        }
        sweep.runs = runs.len();
        info!("Found {} runs", sweep.runs);

        let jobs: Vec<Job> = runs
            .iter()
            .map(|(experiment, run)| Job {
                experiment: *experiment,
                run,
            })
            .collect();

        if self.workers > 1 {
            for result in self.build_parallel(&experiments, &jobs) {
                self.collect(result, &mut sweep)?;
            }
        } else {
            for job in jobs.iter() {
                let result = self.build(&experiments, job);
                self.collect(result, &mut sweep)?;
            }
        }

        info!(
            "Built {} records, skipped {}",
            sweep.records.len(),
            sweep.skipped
        );
        Ok(sweep)
    }

    fn build(&self, experiments: &[Experiment], job: &Job) -> Result<Record> {
        debug!("Building record of run {}", job.run.info.run_id);
        self.builder
            .build(&experiments[job.experiment], job.run)
            .with_context(|| format!("Failed to build record of run {}", job.run.info.run_id))
    }

    fn build_parallel(&self, experiments: &[Experiment], jobs: &[Job]) -> Vec<Result<Record>> {
        let (job_s, job_r) = unbounded();
        let (result_s, result_r) = unbounded();
        for job in jobs.iter().enumerate() {
            // The receiver is alive until the end of this function.
            let _ = job_s.send(job);
        }
        drop(job_s);

        std::thread::scope(|scope| {
            for _ in 0..self.workers.min(jobs.len()) {
                let job_r = job_r.clone();
                let result_s = result_s.clone();
                scope.spawn(move || {
                    for (i, job) in job_r.iter() {
                        if result_s.send((i, self.build(experiments, job))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_s);

        let mut results: Vec<(usize, Result<Record>)> = result_r.iter().collect();
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, r)| r).collect()
    }

    fn collect(&self, result: Result<Record>, sweep: &mut Sweep) -> Result<()> {
        match result {
            Ok(record) => {
                sweep.records.push(record);
                Ok(())
            }
            Err(e) => self.absorb(e, sweep),
        }
    }

    fn absorb(&self, e: Error, sweep: &mut Sweep) -> Result<()> {
        match self.policy {
            FailurePolicy::Skip => {
                warn!("Skipped: {:#}", e);
                sweep.skipped += 1;
                Ok(())
            }
            FailurePolicy::Abort => Err(e),
        }
    }
}
