//! Multi-sheet report and the interface of its writers.
use crate::record::Table;
use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

/// Sheet with one row per run.
pub const EXPERIMENT_SHEET: &str = "Experiment Metrics";

/// Sheet with one row per latest version of each registered model.
pub const REGISTERED_MODELS_SHEET: &str = "Registered Models";

/// Destination of a report.
///
/// Rows are buffered by the writer; nothing is persisted before [`ReportWriter::save()`].
pub trait ReportWriter {
    /// Appends a row to the named sheet, creating the sheet on first use.
    fn append_row(&mut self, sheet: &str, row: &[String]) -> Result<()>;

    /// Persists all sheets and returns the paths written.
    fn save(&mut self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// A named table.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Sheets of a report, in output order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    sheets: Vec<Sheet>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: impl Into<String>, table: Table) {
        self.sheets.push(Sheet {
            name: name.into(),
            table,
        });
    }

    /// Writes every sheet, header first, then saves the writer to `path`.
    pub fn write<W: ReportWriter + ?Sized>(&self, writer: &mut W, path: &Path) -> Result<Vec<PathBuf>> {
        for sheet in self.sheets.iter() {
            info!("Sheet '{}': {} rows", sheet.name, sheet.table.len());
            writer.append_row(&sheet.name, &sheet.table.header())?;
            for row in sheet.table.rows() {
                writer.append_row(&sheet.name, &row)?;
            }
        }
        writer.save(path)
    }
}
