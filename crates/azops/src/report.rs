//! Tabular report export (CSV or JSON).

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::OpsError;

/// A row type that can be exported as a CSV line or a JSON object.
pub trait TabularRecord: Serialize {
    /// Column headers, in CSV order.
    const HEADERS: &'static [&'static str];

    /// Cell values, in [`Self::HEADERS`] order.
    fn cells(&self) -> Vec<String>;
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    /// `.json` (any case) selects JSON; anything else is CSV.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

/// Render records as CSV with a header line. Lines end with CRLF.
#[must_use]
pub fn to_csv<R: TabularRecord>(records: &[R]) -> String {
    let mut out = String::new();
    push_csv_line(&mut out, R::HEADERS.iter().copied());
    for record in records {
        let cells = record.cells();
        push_csv_line(&mut out, cells.iter().map(String::as_str));
    }
    out
}

fn push_csv_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let line = cells.map(escape_csv).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

/// Quote a field when it contains a delimiter, quote or line break.
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write records to `path`, creating parent directories as needed.
pub async fn write_report<R: TabularRecord>(path: &Path, records: &[R]) -> Result<(), OpsError> {
    let format = ReportFormat::from_path(path);
    let body = match format {
        ReportFormat::Json => serde_json::to_string_pretty(records)?,
        ReportFormat::Csv => to_csv(records),
    };

    let io_err = |source| OpsError::Report {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        debug!(dir = %parent.display(), "Creating report directory");
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, body).await.map_err(io_err)?;

    info!(
        path = %path.display(),
        format = ?format,
        rows = records.len(),
        "Report written"
    );
    Ok(())
}
