//! Accumulation of sparse records into a rectangular table.
use super::Record;
use crate::aggregator::ResourceSlot;
use std::collections::HashSet;
use xxhash_rust::xxh3::Xxh3Builder;

/// Records sharing a header.
///
/// The header is the list of fixed columns followed by the union of all other columns present
/// in any record. Slot columns are ordered by slot index, history before average; any other
/// extra column follows in lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    fixed: Vec<String>,
    records: Vec<Record>,
}

fn column_order(name: &str) -> (usize, usize, &str) {
    match ResourceSlot::from_column(name) {
        Some((slot, column)) => (slot.index(), column as usize, ""),
        None => (usize::MAX, 0, name),
    }
}

impl Table {
    /// Creates an empty table with the given fixed columns.
    pub fn new(fixed: &[&str]) -> Self {
        Self {
            fixed: fixed.iter().map(|c| c.to_string()).collect(),
            records: vec![],
        }
    }

    /// Appends a record.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Computes the header from the records stored so far.
    pub fn header(&self) -> Vec<String> {
        let mut extra = HashSet::<&String, Xxh3Builder>::default();
        for record in self.records.iter() {
            for k in record.keys() {
                if !self.fixed.contains(k) {
                    extra.insert(k);
                }
            }
        }
        let mut extra: Vec<&String> = extra.into_iter().collect();
        extra.sort_by(|a, b| column_order(a).cmp(&column_order(b)));

        self.fixed
            .iter()
            .cloned()
            .chain(extra.into_iter().cloned())
            .collect()
    }

    /// Renders all records as rows aligned to [`Table::header()`].
    ///
    /// Absent values become empty cells.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let header = self.header();
        self.records
            .iter()
            .map(|record| {
                header
                    .iter()
                    .map(|k| record.get(k).map(|v| v.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

impl Extend<Record> for Table {
    fn extend<T: IntoIterator<Item = Record>>(&mut self, iter: T) {
        self.records.extend(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordValue;

    #[test]
    fn test_header_orders_slots_numerically() {
        let mut table = Table::new(&["Run ID"]);
        table.push(Record::from_slice(&[
            ("Run ID", RecordValue::from("a")),
            ("Slot_10_Average_Utilization", RecordValue::Scalar(1.0)),
            ("Slot_10_History", RecordValue::from("h")),
        ]));
        table.push(Record::from_slice(&[
            ("Run ID", RecordValue::from("b")),
            ("Slot_2_Average_Utilization", RecordValue::Scalar(2.0)),
            ("Slot_2_History", RecordValue::from("h")),
            ("Note", RecordValue::from("n")),
        ]));

        assert_eq!(
            table.header(),
            vec![
                "Run ID",
                "Slot_2_History",
                "Slot_2_Average_Utilization",
                "Slot_10_History",
                "Slot_10_Average_Utilization",
                "Note",
            ]
        );
    }

    #[test]
    fn test_rows_leave_missing_cells_empty() {
        let mut table = Table::new(&["Run ID", "End Time"]);
        table.push(Record::from_slice(&[("Run ID", RecordValue::from("a"))]));
        table.push(Record::from_slice(&[
            ("Run ID", RecordValue::from("b")),
            ("Slot_0_Average_Utilization", RecordValue::Scalar(7.5)),
        ]));

        assert_eq!(
            table.rows(),
            vec![
                vec!["a".to_string(), "".to_string(), "".to_string()],
                vec!["b".to_string(), "".to_string(), "7.5".to_string()],
            ]
        );
    }
}
