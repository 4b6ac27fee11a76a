use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use aquabill_core::report::{Statement, SupplyReport};

use crate::error::InvoiceError;
use crate::views::{clocks, display_date, plain_amount};

const STATEMENT_HEADERS: [&str; 10] =
    ["Date", "Crop", "Start", "End", "Hours", "Minutes", "Amount", "Notes", "Status", "Bill"];

const REPORT_HEADERS: [&str; 11] = [
    "Date", "Customer ID", "Customer", "Crop", "Start", "End", "Hours", "Minutes", "Amount",
    "Notes", "Status",
];

/// Writes a statement as CSV and returns the path written, which always ends in `.csv`.
pub fn export_statement(statement: &Statement, path: &Path) -> Result<PathBuf, InvoiceError> {
    let path = csv_path(path);
    write_statement_csv(statement, create(&path)?)?;
    info!(
        event_name = "invoice.exported",
        path = %path.display(),
        rows = statement.lines.len(),
        "statement exported"
    );
    Ok(path)
}

pub fn export_report(report: &SupplyReport, path: &Path) -> Result<PathBuf, InvoiceError> {
    let path = csv_path(path);
    write_report_csv(report, create(&path)?)?;
    info!(
        event_name = "invoice.exported",
        path = %path.display(),
        rows = report.lines.len(),
        "supply report exported"
    );
    Ok(path)
}

pub fn write_statement_csv<W: Write>(statement: &Statement, out: W) -> Result<(), InvoiceError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(STATEMENT_HEADERS)?;
    for line in &statement.lines {
        let (start, end) = clocks(&line.record);
        let (hours, minutes) = line.record.window.hours_and_minutes();
        writer.write_record([
            display_date(line.record.supply_date()),
            line.record.crop.clone().unwrap_or_default(),
            start,
            end,
            hours.to_string(),
            minutes.to_string(),
            plain_amount(line.bill.amount()),
            line.record.notes.clone().unwrap_or_default(),
            line.bill.status.as_str().to_string(),
            line.bill.id.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_report_csv<W: Write>(report: &SupplyReport, out: W) -> Result<(), InvoiceError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(REPORT_HEADERS)?;
    for line in &report.lines {
        let (start, end) = clocks(&line.record);
        let (hours, minutes) = line.record.window.hours_and_minutes();
        writer.write_record([
            display_date(line.record.supply_date()),
            line.record.customer_id.to_string(),
            line.customer_name.clone(),
            line.record.crop.clone().unwrap_or_default(),
            start,
            end,
            hours.to_string(),
            minutes.to_string(),
            plain_amount(line.bill.amount()),
            line.record.notes.clone().unwrap_or_default(),
            line.bill.status.as_str().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<File, InvoiceError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// Appends `.csv` unless the path already carries it.
fn csv_path(path: &Path) -> PathBuf {
    let has_csv_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if has_csv_extension {
        return path.to_path_buf();
    }
    let mut raw = path.as_os_str().to_owned();
    raw.push(".csv");
    PathBuf::from(raw)
}
