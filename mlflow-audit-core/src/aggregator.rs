//! Reduction of per-slot resource metrics into summary statistics.
use crate::{
    fetcher::MetricHistoryFetcher,
    record::{Record, RecordValue},
    tracking::TrackingSource,
};
use log::trace;
use std::{collections::BTreeMap, fmt::Display};

/// Placeholder for the slot index in a metric name template.
pub const SLOT_PLACEHOLDER: &str = "{slot}";

const SLOT_PREFIX: &str = "Slot_";
const HISTORY_SUFFIX: &str = "_History";
const AVERAGE_SUFFIX: &str = "_Average_Utilization";

/// Index of a hardware resource, e.g. a GPU, whose metrics may be tracked in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceSlot(usize);

/// Kinds of report columns derived from a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotColumn {
    History = 0,
    Average = 1,
}

impl ResourceSlot {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// Name of the column holding the serialized history, e.g. `Slot_3_History`.
    pub fn history_column(&self) -> String {
        format!("{}{}{}", SLOT_PREFIX, self.0, HISTORY_SUFFIX)
    }

    /// Name of the column holding the average, e.g. `Slot_3_Average_Utilization`.
    pub fn average_column(&self) -> String {
        format!("{}{}{}", SLOT_PREFIX, self.0, AVERAGE_SUFFIX)
    }

    /// Recognizes a column produced by [`ResourceSlot::history_column()`] or
    /// [`ResourceSlot::average_column()`].
    pub fn from_column(name: &str) -> Option<(Self, SlotColumn)> {
        let rest = name.strip_prefix(SLOT_PREFIX)?;
        let (index, column) = if let Some(index) = rest.strip_suffix(HISTORY_SUFFIX) {
            (index, SlotColumn::History)
        } else {
            (rest.strip_suffix(AVERAGE_SUFFIX)?, SlotColumn::Average)
        };
        Some((Self(index.parse().ok()?), column))
    }
}

impl Display for ResourceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-slot summaries of one run.
///
/// Only slots with a non-empty series appear in the maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotUtilization {
    /// Serialized histories, see [`MetricSeries::to_history_string()`].
    ///
    /// [`MetricSeries::to_history_string()`]: crate::metric::MetricSeries::to_history_string
    pub histories: BTreeMap<ResourceSlot, String>,

    /// Arithmetic means of the series.
    pub averages: BTreeMap<ResourceSlot, f64>,

    /// Mean of the per-slot averages, `None` when no slot is populated.
    pub overall_average: Option<f64>,
}

impl SlotUtilization {
    /// Builds the summaries from per-slot averages and histories.
    fn from_slots(slots: Vec<(ResourceSlot, f64, String)>) -> Self {
        let overall_average = if slots.is_empty() {
            None
        } else {
            Some(slots.iter().map(|(_, avg, _)| avg).sum::<f64>() / slots.len() as f64)
        };
        let mut histories = BTreeMap::new();
        let mut averages = BTreeMap::new();
        for (slot, average, history) in slots.into_iter() {
            averages.insert(slot, average);
            histories.insert(slot, history);
        }

        Self {
            histories,
            averages,
            overall_average,
        }
    }

    /// Number of populated slots.
    pub fn populated(&self) -> usize {
        self.averages.len()
    }

    /// Slot columns of a report row: one history and one average column per populated slot.
    pub fn slot_columns(&self) -> Record {
        let mut record = Record::empty();
        for (slot, history) in self.histories.iter() {
            record.insert(slot.history_column(), RecordValue::String(history.clone()));
        }
        for (slot, average) in self.averages.iter() {
            record.insert(slot.average_column(), RecordValue::Scalar(*average));
        }
        record
    }
}

/// Probes a bounded set of slot metrics of a run and summarizes them.
///
/// Every slot in `0..max_slots` costs one history request, whether the slot exists or not.
pub struct ResourceUtilizationAggregator<'a, S: ?Sized> {
    fetcher: MetricHistoryFetcher<'a, S>,
    max_slots: usize,
    metric_template: String,
}

impl<'a, S> ResourceUtilizationAggregator<'a, S>
where
    S: TrackingSource + ?Sized,
{
    /// Creates an aggregator.
    ///
    /// `metric_template` is the metric name with [`SLOT_PLACEHOLDER`] standing for the slot
    /// index, e.g. `system/gpu_{slot}_utilization_percentage`.
    pub fn new(source: &'a S, max_slots: usize, metric_template: impl Into<String>) -> Self {
        Self {
            fetcher: MetricHistoryFetcher::new(source),
            max_slots,
            metric_template: metric_template.into(),
        }
    }

    /// Name of the metric tracking `slot`.
    pub fn metric_name(&self, slot: ResourceSlot) -> String {
        self.metric_template
            .replace(SLOT_PLACEHOLDER, &slot.index().to_string())
    }

    /// Summarizes the slot metrics of run `run_id`.
    pub fn aggregate(&self, run_id: &str) -> SlotUtilization {
        let slots = (0..self.max_slots)
            .map(ResourceSlot::new)
            .filter_map(|slot| {
                let series = self.fetcher.fetch(run_id, &self.metric_name(slot));
                let average = series.mean()?;
                trace!(
                    "Run {}, slot {}: {} samples, average {}",
                    run_id,
                    slot,
                    series.len(),
                    average
                );
                Some((slot, average, series.to_history_string()))
            })
            .collect();

        SlotUtilization::from_slots(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metric::{MetricSample, MetricSeries},
        tracking::{Experiment, RegisteredModel, Run},
    };
    use anyhow::{anyhow, Result};
    use std::collections::HashMap;

    const TEMPLATE: &str = "system/gpu_{slot}_utilization_percentage";

    #[derive(Default)]
    struct SlotMetrics(HashMap<String, Vec<MetricSample>>);

    impl SlotMetrics {
        fn with(mut self, slot: usize, values: &[f64]) -> Self {
            let samples = values
                .iter()
                .enumerate()
                .map(|(t, v)| MetricSample::new(t as i64 * 1000, *v))
                .collect();
            self.0.insert(TEMPLATE.replace("{slot}", &slot.to_string()), samples);
            self
        }
    }

    impl TrackingSource for SlotMetrics {
        fn list_experiments(&self) -> Result<Vec<Experiment>> {
            Ok(vec![])
        }

        fn list_runs(&self, _experiment_id: &str) -> Result<Vec<Run>> {
            Ok(vec![])
        }

        fn get_metric_history(&self, _run_id: &str, metric_key: &str) -> Result<Vec<MetricSample>> {
            self.0
                .get(metric_key)
                .cloned()
                .ok_or_else(|| anyhow!("metric {} not found", metric_key))
        }

        fn list_artifacts(&self, _run_id: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }

        fn list_registered_models(&self) -> Result<Vec<RegisteredModel>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_no_slots_means_absent_overall_average() {
        let source = SlotMetrics::default();
        let utilization = ResourceUtilizationAggregator::new(&source, 12, TEMPLATE).aggregate("r");

        assert_eq!(utilization.overall_average, None);
        assert_eq!(utilization.populated(), 0);
        assert!(utilization.slot_columns().is_empty());
    }

    #[test]
    fn test_single_slot_average() {
        let source = SlotMetrics::default().with(0, &[5.0, 15.0]);
        let utilization = ResourceUtilizationAggregator::new(&source, 12, TEMPLATE).aggregate("r");

        assert_eq!(utilization.averages[&ResourceSlot::new(0)], 10.0);
        assert_eq!(utilization.overall_average, Some(10.0));
    }

    #[test]
    fn test_overall_average_ignores_missing_slots() {
        let source = SlotMetrics::default()
            .with(1, &[10.0, 30.0])
            .with(4, &[60.0])
            .with(11, &[]);
        let utilization = ResourceUtilizationAggregator::new(&source, 12, TEMPLATE).aggregate("r");

        assert_eq!(utilization.populated(), 2);
        assert_eq!(utilization.overall_average, Some(40.0));

        let record = utilization.slot_columns();
        assert_eq!(record.len(), 4);
        assert_eq!(record.get_scalar("Slot_1_Average_Utilization").unwrap(), 20.0);
        assert_eq!(record.get_scalar("Slot_4_Average_Utilization").unwrap(), 60.0);
        assert!(!record.contains_key("Slot_11_History"));

        let history = record.get_string("Slot_1_History").unwrap();
        let parsed = MetricSeries::parse_history(&history).unwrap();
        assert_eq!(
            parsed.samples(),
            &[MetricSample::new(0, 10.0), MetricSample::new(1000, 30.0)]
        );
    }

    #[test]
    fn test_slots_beyond_bound_are_not_probed() {
        let source = SlotMetrics::default().with(5, &[50.0]);
        let utilization = ResourceUtilizationAggregator::new(&source, 4, TEMPLATE).aggregate("r");
        assert_eq!(utilization.overall_average, None);
    }

    #[test]
    fn test_slot_columns_round_trip_names() {
        let slot = ResourceSlot::new(7);
        assert_eq!(slot.history_column(), "Slot_7_History");
        assert_eq!(
            ResourceSlot::from_column(&slot.history_column()),
            Some((slot, SlotColumn::History))
        );
        assert_eq!(
            ResourceSlot::from_column(&slot.average_column()),
            Some((slot, SlotColumn::Average))
        );
        assert_eq!(ResourceSlot::from_column("Slot_x_History"), None);
        assert_eq!(ResourceSlot::from_column("Run ID"), None);
    }
}
