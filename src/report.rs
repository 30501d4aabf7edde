use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::Error;
use crate::model::{CopyOutcome, CopyStatus};

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    torrent: &'a str,
    source: String,
    destination: String,
    status: &'static str,
    detail: String,
    bytes: u64,
}

impl<'a> From<&'a CopyOutcome> for ReportRow<'a> {
    fn from(outcome: &'a CopyOutcome) -> Self {
        let (status, detail, bytes) = match &outcome.status {
            CopyStatus::Copied { bytes } => ("copied", String::new(), *bytes),
            CopyStatus::Planned => ("planned", String::new(), 0),
            CopyStatus::Skipped { reason } => ("skipped", reason.to_string(), 0),
        };
        ReportRow {
            torrent: &outcome.torrent,
            source: outcome.task.source.to_string_lossy().into_owned(),
            destination: outcome.task.destination.to_string_lossy().into_owned(),
            status,
            detail,
            bytes,
        }
    }
}

/// Append one row per outcome to a CSV file, writing the header only when
/// the file is new.
pub fn append_csv(path: &Path, outcomes: &[CopyOutcome]) -> Result<(), Error> {
    let file_exists = fs::metadata(path).is_ok();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|err| Error::io(path, err))?;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    for outcome in outcomes {
        wtr.serialize(ReportRow::from(outcome))
            .map_err(|err| Error::io(path, err.into()))?;
    }
    wtr.flush().map_err(|err| Error::io(path, err))?;
    Ok(())
}
