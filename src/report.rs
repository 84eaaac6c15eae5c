//! Report output
//!
//! The aggregated rows go to a [`ReportSink`]. The default sink writes an xlsx
//! workbook with a single `global` sheet whose columns are
//! `resourceGroup, severity, number`.

use crate::error_handling::{ErrorContext, ReportResult};
use crate::models::AggregationRow;
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column headers of the report, in order
pub const REPORT_COLUMNS: [&str; 3] = ["resourceGroup", "severity", "number"];

/// Worksheet holding the rows
pub const SHEET_NAME: &str = "global";

/// Destination for the aggregated rows
pub trait ReportSink: Send + Sync {
    /// Write `rows` under `file_name`, returning where they landed
    fn write(&self, rows: &[AggregationRow], file_name: &str) -> ReportResult<PathBuf>;
}

/// Report file name: `<client>_resource_groups_<UTC timestamp>.xlsx`
pub fn report_file_name(client: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_resource_groups_{}.xlsx",
        client,
        at.format("%Y-%m-%d_%H.%M.%S")
    )
}

/// Writes the report as an xlsx workbook
#[derive(Debug, Clone)]
pub struct XlsxReportWriter {
    output_dir: PathBuf,
}

impl XlsxReportWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ReportSink for XlsxReportWriter {
    fn write(&self, rows: &[AggregationRow], file_name: &str) -> ReportResult<PathBuf> {
        let path = self.output_dir.join(file_name);
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        let sheet = workbook.add_worksheet();
        sheet
            .set_name(SHEET_NAME)
            .with_output_context(|| "Failed to name worksheet".to_string())?;

        for (col, title) in REPORT_COLUMNS.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, *title, &header)
                .with_output_context(|| "Failed to write header".to_string())?;
        }

        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet
                .write_string(r, 0, &row.resource_group)
                .with_output_context(|| format!("Failed to write row {}", r))?;
            sheet
                .write_string(r, 1, &row.severity)
                .with_output_context(|| format!("Failed to write row {}", r))?;
            sheet
                .write_number(r, 2, row.number as f64)
                .with_output_context(|| format!("Failed to write row {}", r))?;
        }

        workbook
            .save(&path)
            .with_output_context(|| format!("Failed to save report {:?}", path))?;

        info!("Wrote {} rows to {:?}", rows.len(), path);
        Ok(path)
    }
}

/// Render rows as a fixed-width text table
pub fn render_table(rows: &[AggregationRow]) -> String {
    let group_width = rows
        .iter()
        .map(|r| r.resource_group.len())
        .chain(std::iter::once(REPORT_COLUMNS[0].len()))
        .max()
        .unwrap_or(0);
    let severity_width = rows
        .iter()
        .map(|r| r.severity.len())
        .chain(std::iter::once(REPORT_COLUMNS[1].len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<gw$}  {:<sw$}  {:>8}",
        REPORT_COLUMNS[0],
        REPORT_COLUMNS[1],
        REPORT_COLUMNS[2],
        gw = group_width,
        sw = severity_width
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<gw$}  {:<sw$}  {:>8}",
            row.resource_group,
            row.severity,
            row.number,
            gw = group_width,
            sw = severity_width
        );
    }
    out
}
