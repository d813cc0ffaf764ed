//! Types for the denormalized rows of the audit report.
//!
//! A [`Record`] is a sparse mapping from column names to [`RecordValue`]s. Columns whose value
//! is absent are simply not inserted, so records of different runs may have different column
//! sets. A [`Table`] collects records and computes the union of their columns once all of them
//! are known.
//!
//! ```rust
//! use mlflow_audit_core::record::{Record, RecordValue, Table};
//!
//! let mut record = Record::empty();
//! record.insert("Run ID", RecordValue::String("a1b2".to_string()));
//! record.insert("Slot_0_Average_Utilization", RecordValue::Scalar(42.0));
//!
//! let mut table = Table::new(&["Run ID", "Duration (s)"]);
//! table.push(record);
//! assert_eq!(table.header(), vec!["Run ID", "Duration (s)", "Slot_0_Average_Utilization"]);
//! ```
mod base;
mod table;

pub use base::{Record, RecordValue};
pub use table::Table;
