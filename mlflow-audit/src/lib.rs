//! Efficiency audit of a MLflow tracking server.
//!
//! Walks every run of every experiment, summarizes per-GPU utilization and provenance of each
//! run, and writes one row per run to a CSV report. See [`run_audit()`].
mod audit;
pub mod csv_writer;
pub use audit::{run_audit, AuditOutcome};
pub use csv_writer::CsvReportWriter;
