//! Export of normalized records as a single-sheet workbook.
//!
//! The artifact has one sheet named `Acoes` with a header row
//! `product, quantity, updatedValue, assetType` and one row per record,
//! in the order given. A CSV rendition with the same columns is also
//! available.

use chrono::{Local, NaiveDate};
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use crate::models::PositionRecord;

/// Sheet name of the exported workbook.
pub const EXPORT_SHEET_NAME: &str = "Acoes";

/// Column headers, in output order.
pub const EXPORT_HEADERS: [&str; 4] = ["product", "quantity", "updatedValue", "assetType"];

const FILE_PREFIX: &str = "posicao-processada";

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

/// A produced export file.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// What an export call did.
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// No records; nothing was written.
    NothingToExport,
    Exported(ExportArtifact),
}

impl ExportOutcome {
    pub fn artifact(&self) -> Option<&ExportArtifact> {
        match self {
            ExportOutcome::NothingToExport => None,
            ExportOutcome::Exported(a) => Some(a),
        }
    }
}

/// Export records as an `.xlsx` dated today.
pub fn export(records: &[PositionRecord]) -> ExportResult<ExportOutcome> {
    export_as(records, ExportFormat::Xlsx, Local::now().date_naive())
}

/// Export records in the given format, naming the file after `date`.
///
/// Fails on the first record with an empty product or a quantity that is
/// not positive.
pub fn export_as(
    records: &[PositionRecord],
    format: ExportFormat,
    date: NaiveDate,
) -> ExportResult<ExportOutcome> {
    if records.is_empty() {
        return Ok(ExportOutcome::NothingToExport);
    }

    for (index, record) in records.iter().enumerate() {
        record
            .check()
            .map_err(|reason| ExportError::InvalidRecord { index, reason })?;
    }

    let bytes = match format {
        ExportFormat::Xlsx => to_xlsx(records)?,
        ExportFormat::Csv => to_csv(records)?,
    };

    Ok(ExportOutcome::Exported(ExportArtifact {
        file_name: export_file_name(format, date),
        format,
        bytes,
    }))
}

/// `posicao-processada-<YYYY-MM-DD>.<ext>`
pub fn export_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}-{}.{}",
        FILE_PREFIX,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Render records as an XLSX workbook in memory.
pub fn to_xlsx(records: &[PositionRecord]) -> ExportResult<Vec<u8>> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, record.product.as_str())?;
        worksheet.write_number(row, 1, record.quantity)?;
        worksheet.write_number(row, 2, record.updated_value)?;
        worksheet.write_string(row, 3, record.asset_type.label())?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Render records as CSV (comma separated, UTF-8).
pub fn to_csv(records: &[PositionRecord]) -> ExportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;

    for record in records {
        writer.write_record([
            record.product.clone(),
            record.quantity.to_string(),
            record.updated_value.to_string(),
            record.asset_type.label().to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))
}
