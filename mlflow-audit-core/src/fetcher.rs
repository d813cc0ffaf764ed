use crate::{metric::MetricSeries, tracking::TrackingSource};
use log::debug;

/// Retrieves metric histories, mapping any failure to an empty series.
///
/// A metric that was never logged, an unknown run and a transient network error all look the
/// same to the caller: no data. A single unavailable metric never aborts a sweep.
pub struct MetricHistoryFetcher<'a, S: ?Sized> {
    source: &'a S,
}

impl<'a, S> MetricHistoryFetcher<'a, S>
where
    S: TrackingSource + ?Sized,
{
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Fetches the chronologically ordered history of `metric_name` in run `run_id`.
    pub fn fetch(&self, run_id: &str, metric_name: &str) -> MetricSeries {
        match self.source.get_metric_history(run_id, metric_name) {
            Ok(samples) => MetricSeries::new(samples),
            Err(e) => {
                debug!(
                    "No history of '{}' for run {}: {:#}",
                    metric_name, run_id, e
                );
                MetricSeries::empty()
            }
        }
    }
}
