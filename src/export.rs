//! Conversion of the interaction journal into a spreadsheet uploaded to
//! Yandex Disk.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use thiserror::Error;

use crate::config::Config;
use crate::journal::InteractionRecord;
use crate::services::disk::{Disk, DiskError};
use crate::utils::ResultExt;

/// Where the rendered spreadsheet goes on Disk.
const REMOTE_PATH: &str = "/trash/data_to_dashboard/data.xlsx";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("YA_OAUTH is not set, cannot talk to Disk")]
    MissingCredential,
    #[error("journal file {0} does not exist")]
    MissingJournal(PathBuf),
    #[error("failed to read the journal: {0}")]
    Journal(#[from] csv::Error),
    #[error("failed to render the spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("Disk call failed: {0}")]
    Disk(#[from] DiskError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One full export pass: journal → spreadsheet → Disk → local cleanup.
/// Straight-line, not transactional: each step only starts after the
/// previous one succeeded, and a failed upload leaves the spreadsheet on
/// local disk.
pub async fn run(
    config: &Config,
    http: reqwest::Client,
) -> Result<(), ExportError> {
    let token =
        config.disk_token.as_deref().ok_or(ExportError::MissingCredential)?;
    let disk = Disk::new(http, token);
    disk.check_token().await?;
    log::info!("Disk token accepted");

    let journal_path = Path::new(crate::JOURNAL_FILENAME);
    if !journal_path.exists() {
        return Err(ExportError::MissingJournal(journal_path.to_path_buf()));
    }
    let records = load_records(journal_path)?;
    if records.is_empty() {
        log::warn!(
            "journal {} has no records, skipping export",
            journal_path.display()
        );
        return Ok(());
    }

    let spreadsheet_path = Path::new(crate::SPREADSHEET_FILENAME);
    write_spreadsheet(&records, spreadsheet_path)?;
    log::info!(
        "rendered {} records to {}",
        records.len(),
        spreadsheet_path.display()
    );

    if let Some(parent) = Path::new(REMOTE_PATH).parent().and_then(Path::to_str)
    {
        disk.ensure_dir(parent).await?;
    }
    disk.upload(REMOTE_PATH, std::fs::read(spreadsheet_path)?).await?;
    log::info!("uploaded {} to {REMOTE_PATH}", spreadsheet_path.display());

    std::fs::remove_file(spreadsheet_path)
        .warn_on_error("failed to remove the local spreadsheet");
    Ok(())
}

fn load_records(path: &Path) -> Result<Vec<InteractionRecord>, csv::Error> {
    csv::Reader::from_path(path)?.into_deserialize().collect()
}

fn write_spreadsheet(
    records: &[InteractionRecord],
    path: &Path,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_row(0, 0, InteractionRecord::COLUMNS)?;
    for (row, record) in (1u32..).zip(records) {
        worksheet.write(row, 0, record.id)?;
        worksheet.write(row, 1, &record.datetime)?;
        worksheet.write(row, 2, record.action.as_str())?;
        worksheet.write(row, 3, record.request_length)?;
        worksheet.write(row, 4, record.response_length)?;
        worksheet.write(row, 5, record.processing_time)?;
    }
    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{Action, Journal};

    fn sample_records() -> Vec<InteractionRecord> {
        vec![
            InteractionRecord {
                id: 1,
                datetime: "01.01.2026 00:00:00".to_string(),
                action: Action::Start,
                request_length: 0,
                response_length: 87,
                processing_time: 0.01,
            },
            InteractionRecord {
                id: 2,
                datetime: "01.01.2026 00:00:05".to_string(),
                action: Action::Answer,
                request_length: 12,
                response_length: 30,
                processing_time: 0.25,
            },
        ]
    }

    #[test]
    fn journal_rows_come_back_from_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let journal = Journal::new(&path);
        for record in sample_records() {
            journal.append(&record);
        }

        let records = load_records(&path).unwrap();
        assert_eq!(records, sample_records());
    }

    #[test]
    fn header_only_journal_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, format!("{}\n", InteractionRecord::COLUMNS.join(",")))
            .unwrap();
        assert!(load_records(&path).unwrap().is_empty());
    }

    #[test]
    fn spreadsheet_is_rendered_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        write_spreadsheet(&sample_records(), &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
