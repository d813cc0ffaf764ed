//! CSV files as the persisted form of a report.
use anyhow::{Context, Result};
use log::info;
use mlflow_audit_core::report::ReportWriter;
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

/// Writes each sheet of a report as a CSV file.
///
/// The first sheet goes to the path given to [`ReportWriter::save()`]; every other sheet goes
/// next to it as `<stem>-<sheet>.<ext>`, e.g. `summary-registered-models.csv`. Rows are kept in
/// memory until saved. All sheets are first written under temporary names, then renamed; if
/// any step fails, the temporary files and the sheets already moved by this save are removed.
#[derive(Debug, Default)]
pub struct CsvReportWriter {
    sheets: Vec<(String, Vec<Vec<String>>)>,
}

/// Lowercase, dash-separated form of a sheet name.
fn slug(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Path of a sheet other than the first one.
pub fn sheet_path(path: &Path, sheet: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut file_name = OsString::from(format!("{}-{}", stem, slug(sheet)));
    if let Some(ext) = path.extension() {
        file_name.push(".");
        file_name.push(ext);
    }
    path.with_file_name(file_name)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn write_csv(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for row in rows.iter() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Removes files left by a failed save. Errors are ignored, the files may not exist.
fn remove_all<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

impl CsvReportWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportWriter for CsvReportWriter {
    fn append_row(&mut self, sheet: &str, row: &[String]) -> Result<()> {
        match self.sheets.iter_mut().find(|(name, _)| name.as_str() == sheet) {
            Some((_, rows)) => rows.push(row.to_vec()),
            None => self.sheets.push((sheet.to_string(), vec![row.to_vec()])),
        }
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<Vec<PathBuf>> {
        let paths: Vec<PathBuf> = self
            .sheets
            .iter()
            .enumerate()
            .map(|(i, (sheet, _))| match i {
                0 => path.to_path_buf(),
                _ => sheet_path(path, sheet),
            })
            .collect();
        let tmps: Vec<PathBuf> = paths.iter().map(|p| tmp_path(p)).collect();

        for (tmp, (_, rows)) in tmps.iter().zip(self.sheets.iter()) {
            if let Err(e) = write_csv(tmp, rows) {
                remove_all(tmps.iter());
                return Err(e);
            }
        }

        for (i, (tmp, path)) in tmps.iter().zip(paths.iter()).enumerate() {
            if let Err(e) = fs::rename(tmp, path) {
                remove_all(tmps[i..].iter().chain(paths[..i].iter()));
                return Err(e).with_context(|| format!("Failed to move {:?} to {:?}", tmp, path));
            }
        }

        for ((sheet, rows), path) in self.sheets.iter().zip(paths.iter()) {
            info!("Wrote sheet '{}' ({} rows) to {:?}", sheet, rows.len(), path);
        }
        Ok(paths)
    }
}
