//! Metric samples and their time series.
use crate::error::AuditError;
use itertools::Itertools;

/// Separates entries of a serialized history.
pub const HISTORY_DELIMITER: &str = "; ";

const TIMESTAMP_PREFIX: &str = "Timestamp: ";
const VALUE_SEPARATOR: &str = ", Value: ";

/// One recorded value of a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// Recorded value.
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Chronologically ordered samples of one metric in one run.
///
/// An empty series is a valid outcome: the metric was not logged for the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSeries(Vec<MetricSample>);

impl MetricSeries {
    /// Creates an empty series.
    pub fn empty() -> Self {
        Self(vec![])
    }

    /// Creates a series from samples in any order.
    ///
    /// Samples are sorted by timestamp. The sort is stable, so samples sharing a timestamp keep
    /// the order in which they were given.
    pub fn new(mut samples: Vec<MetricSample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self(samples)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricSample> {
        self.0.iter()
    }

    /// Arithmetic mean of the values, unweighted by the gaps between samples.
    ///
    /// Returns `None` for an empty series.
    pub fn mean(&self) -> Option<f64> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.iter().map(|s| s.value).sum::<f64>() / self.0.len() as f64)
        }
    }

    /// Serializes the series as `Timestamp: T, Value: V` entries joined by
    /// [`HISTORY_DELIMITER`].
    ///
    /// Values are written with the shortest representation that parses back to the same `f64`.
    pub fn to_history_string(&self) -> String {
        self.0
            .iter()
            .map(|s| format!("{}{}{}{:?}", TIMESTAMP_PREFIX, s.timestamp, VALUE_SEPARATOR, s.value))
            .join(HISTORY_DELIMITER)
    }

    /// Parses a string produced by [`MetricSeries::to_history_string()`].
    ///
    /// The order of entries is kept as is.
    pub fn parse_history(s: &str) -> Result<Self, AuditError> {
        if s.is_empty() {
            return Ok(Self::empty());
        }

        let samples = s
            .split(HISTORY_DELIMITER)
            .map(|entry| {
                let invalid = || AuditError::InvalidHistory(entry.to_string());
                let (timestamp, value) = entry
                    .strip_prefix(TIMESTAMP_PREFIX)
                    .and_then(|rest| rest.split_once(VALUE_SEPARATOR))
                    .ok_or_else(invalid)?;
                Ok(MetricSample {
                    timestamp: timestamp.parse().map_err(|_| invalid())?,
                    value: value.parse().map_err(|_| invalid())?,
                })
            })
            .collect::<Result<Vec<_>, AuditError>>()?;

        Ok(Self(samples))
    }
}
